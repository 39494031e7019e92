//! Shader source loading. Compiling and linking is the host's shader service's job.

use std::path::Path;

use anyhow::Context;

/// The source texts of one shader program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
    pub geometry: Option<String>,
}

impl ShaderSources {
    /// Reads the vertex, fragment and (optional) geometry stage from disk.
    pub fn from_files(
        vertex: impl AsRef<Path>,
        fragment: impl AsRef<Path>,
        geometry: Option<&Path>,
    ) -> anyhow::Result<Self> {
        let geometry = match geometry {
            Some(path) => Some(read_stage(path)?),
            None => None,
        };
        Ok(Self {
            vertex: read_stage(vertex.as_ref())?,
            fragment: read_stage(fragment.as_ref())?,
            geometry,
        })
    }
}

fn read_stage(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Shader file {:?} could not be read", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("meshcam-shader-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn reads_all_stages() {
        let dir = scratch_dir("stages");
        std::fs::write(dir.join("model.vs"), "void main() { gl_Position = vec4(0.0); }").unwrap();
        std::fs::write(dir.join("model.fs"), "void main() {}").unwrap();
        std::fs::write(dir.join("model.gs"), "layout (triangles) in;").unwrap();

        let sources = ShaderSources::from_files(
            dir.join("model.vs"),
            dir.join("model.fs"),
            Some(&dir.join("model.gs")),
        )
        .unwrap();
        assert!(sources.vertex.contains("gl_Position"));
        assert_eq!(sources.fragment, "void main() {}");
        assert_eq!(sources.geometry.as_deref(), Some("layout (triangles) in;"));

        let without_geometry =
            ShaderSources::from_files(dir.join("model.vs"), dir.join("model.fs"), None).unwrap();
        assert!(without_geometry.geometry.is_none());
    }

    #[test]
    fn missing_stage_names_the_file() {
        let dir = scratch_dir("missing");
        std::fs::write(dir.join("only.vs"), "").unwrap();

        let err = ShaderSources::from_files(dir.join("only.vs"), dir.join("absent.fs"), None)
            .unwrap_err();
        assert!(format!("{:#}", err).contains("absent.fs"));
    }
}
