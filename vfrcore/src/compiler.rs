use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use ifrinstr::{
    SerializedPackage,
    emit::{SymbolResolver, write_binary, write_c_source, write_json, write_record_list, write_yaml},
};
use log::{info, warn};

use crate::{
    context::CompiledPackage,
    utils::{
        conf::{Artifact, CompileOptions},
        error::{VfrError, VfrResult},
    },
};

/// Everything the writers need besides the package itself.
pub struct EmitInputs<'a> {
    pub symbols: &'a dyn SymbolResolver,
    /// Preprocessed source, echoed into the record list.
    pub source: Option<&'a str>,
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_artifact(
    artifact: Artifact,
    package: SerializedPackage<'_>,
    options: &CompileOptions,
    inputs: &EmitInputs<'_>,
    path: &Path,
) -> VfrResult<()> {
    let file = File::create(path).map_err(|e| VfrError::io(path, e))?;
    let mut out = BufWriter::new(file);
    let written = match artifact {
        Artifact::IfrPackage => write_binary(package, &mut out),
        Artifact::CSource => write_c_source(package, &options.base_name, &mut out),
        Artifact::RecordList => write_record_list(package, inputs.source, &mut out),
        Artifact::Yaml => write_yaml(package, inputs.symbols, &mut out),
        Artifact::Json => write_json(package, inputs.symbols, &mut out),
    };
    written
        .and_then(|()| out.flush())
        .map_err(|e| VfrError::io(path, e))
}

fn remove_all(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            warn!("could not remove '{}': {e}", path.display());
        }
    }
}

/// Writes every artifact enabled in `options` and returns their paths.
///
/// Each artifact is first written next to its destination with a `.tmp`
/// suffix. Only when all of them were written are they renamed into place.
/// A write failure removes the temporaries and leaves every destination
/// untouched. A rename failure also removes the artifacts already renamed,
/// so a failed call never leaves a partial set behind.
pub fn emit_outputs(
    compiled: &mut CompiledPackage,
    options: &CompileOptions,
    inputs: &EmitInputs<'_>,
) -> VfrResult<Vec<PathBuf>> {
    let targets = options.artifact_paths();
    if targets.is_empty() {
        return Ok(Vec::new());
    }
    fs::create_dir_all(&options.output_dir).map_err(|e| VfrError::io(&options.output_dir, e))?;

    let package = compiled.serialized()?;
    let mut temporaries = Vec::with_capacity(targets.len());
    for (artifact, path) in &targets {
        let temp = temp_path(path);
        let result = write_artifact(*artifact, package, options, inputs, &temp);
        temporaries.push(temp);
        if let Err(e) = result {
            remove_all(&temporaries);
            return Err(e);
        }
    }

    for (index, ((artifact, path), temp)) in targets.iter().zip(&temporaries).enumerate() {
        if let Err(e) = fs::rename(temp, path) {
            remove_all(&temporaries[index..]);
            let published: Vec<PathBuf> = targets[..index]
                .iter()
                .map(|(_, published)| published.clone())
                .collect();
            remove_all(&published);
            return Err(VfrError::io(path, e));
        }
        info!("wrote {} to '{}'", artifact.name(), path.display());
    }
    Ok(targets.into_iter().map(|(_, path)| path).collect())
}
