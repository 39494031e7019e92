use std::path::{Path, PathBuf};

use anyhow::bail;

use crate::{
    data_structures::{
        model::{Mesh, Model, ModelVertex},
        scene_graph::{ImportedScene, RawMaterial, RawMesh},
        texture::{TextureCache, TextureRef, TextureRole, TextureRoleMap},
    },
    render::{GpuUpload, TextureHandle, TextureUploader},
    resources::texture::{texture_from_embedded, texture_from_file, ImageDecoder, ImageSource},
};

/**
 * This module contains all logic for loading meshes and textures from external files.
 *
 * Loading happens in three steps: an importer parses the file into an
 * [`ImportedScene`], the post-processing steps selected in [`ImportFlags`]
 * run over its meshes, and the scene is flattened into a [`Model`] whose
 * textures are uploaded through the host's [`GpuUpload`] services.
 */
pub mod gltf;
pub mod mesh;
pub mod obj;
pub mod texture;

/// Post-processing applied to every imported mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportFlags {
    /// Split polygons into triangles.
    pub triangulate: bool,
    /// Generate normals for meshes that have none.
    pub gen_smooth_normals: bool,
    /// Move texture coordinates to a top-left origin.
    pub flip_uvs: bool,
    /// Derive tangents and bitangents for textured meshes that have none.
    pub calc_tangent_space: bool,
}

impl Default for ImportFlags {
    fn default() -> Self {
        Self {
            triangulate: true,
            gen_smooth_normals: true,
            flip_uvs: true,
            calc_tangent_space: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub import_flags: ImportFlags,
    /// Diffuse textures are uploaded as sRGB.
    pub gamma_correction: bool,
    pub flip_vertically: bool,
    pub role_map: TextureRoleMap,
}

/// The asset-import service: parses a file into a scene graph.
pub trait SceneImporter {
    fn import(&self, path: &Path, flags: &ImportFlags) -> anyhow::Result<ImportedScene>;
}

/// Picks an importer by file extension and runs the post-processing steps afterwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileImporter;

impl SceneImporter for FileImporter {
    fn import(&self, path: &Path, flags: &ImportFlags) -> anyhow::Result<ImportedScene> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        let mut scene = match extension.as_str() {
            "obj" => self::obj::import(path, flags)?,
            "gltf" | "glb" => self::gltf::import(path, flags)?,
            _ => bail!("Unsupported model format {:?} of {:?}", extension, path),
        };
        mesh::post_process(&mut scene, flags);
        Ok(scene)
    }
}

impl Model {
    /// Loads a model the best-effort way: any import failure is logged and an
    /// empty model is returned so the host can keep running.
    pub fn load<G: GpuUpload + ?Sized>(
        path: impl AsRef<Path>,
        gpu: &mut G,
        options: &LoadOptions,
    ) -> Model {
        let path = path.as_ref();
        match Self::try_load(path, gpu, options) {
            Ok(model) => model,
            Err(e) => {
                log::error!("Model {:?} could not be loaded: {:#}", path, e);
                Model::empty(model_directory(path), options.gamma_correction)
            }
        }
    }

    /// Like [`Model::load`], but failures are returned instead of logged.
    pub fn try_load<G: GpuUpload + ?Sized>(
        path: impl AsRef<Path>,
        gpu: &mut G,
        options: &LoadOptions,
    ) -> anyhow::Result<Model> {
        let decoder = ImageDecoder::new(options.flip_vertically);
        Self::load_with(path.as_ref(), &FileImporter, &decoder, gpu, options)
    }

    pub fn load_with<G: GpuUpload + ?Sized>(
        path: &Path,
        importer: &dyn SceneImporter,
        decoder: &dyn ImageSource,
        gpu: &mut G,
        options: &LoadOptions,
    ) -> anyhow::Result<Model> {
        let scene = importer.import(path, &options.import_flags)?;
        if scene.incomplete {
            bail!("Scene of {:?} is incomplete", path);
        }
        if scene.root.is_none() {
            bail!("Scene of {:?} has no root node", path);
        }

        Ok(Self::from_scene(&scene, model_directory(path), decoder, gpu, options))
    }

    /**
     * Flattens `scene` into meshes, depth-first with a node's own meshes before
     * its children's, and uploads every texture the meshes reference.
     *
     * A texture path is uploaded once per model; later references reuse the
     * cached texture, role included.
     */
    pub fn from_scene<G: GpuUpload + ?Sized>(
        scene: &ImportedScene,
        directory: impl Into<PathBuf>,
        decoder: &dyn ImageSource,
        gpu: &mut G,
        options: &LoadOptions,
    ) -> Model {
        let directory = directory.into();
        let mut loader = SceneLoader {
            scene,
            directory: &directory,
            decoder,
            options,
            textures_loaded: TextureCache::new(),
        };

        let mut meshes = Vec::with_capacity(scene.meshes.len());
        scene.visit_meshes(&mut |node, raw| {
            let mesh = loader.process_mesh(raw, gpu);
            log::debug!(
                "Mesh {:?} of node {:?}: {} vertices, {} indices, {} textures",
                mesh.name,
                node.name,
                mesh.vertices().len(),
                mesh.indices().len(),
                mesh.textures().len()
            );
            meshes.push(mesh);
        });

        log::info!(
            "Loaded {:?}: {} nodes, {} meshes, {} textures",
            directory,
            scene.node_count(),
            meshes.len(),
            loader.textures_loaded.len()
        );

        let textures_loaded = loader.textures_loaded;
        Model::from_parts(directory, meshes, textures_loaded, options.gamma_correction)
    }
}

/// Directory textures of the model at `path` are resolved against.
fn model_directory(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

struct SceneLoader<'a> {
    scene: &'a ImportedScene,
    directory: &'a Path,
    decoder: &'a dyn ImageSource,
    options: &'a LoadOptions,
    textures_loaded: TextureCache,
}

impl SceneLoader<'_> {
    fn process_mesh<G: GpuUpload + ?Sized>(&mut self, raw: &RawMesh, gpu: &mut G) -> Mesh {
        let vertices = (0..raw.vertex_count())
            .map(|i| {
                let mut vertex = ModelVertex {
                    position: raw.positions[i],
                    ..Default::default()
                };
                if let Some(normal) = raw.normals.as_ref().and_then(|n| n.get(i)) {
                    vertex.normal = *normal;
                }
                // tangent space only means something when there are texture coordinates
                if let Some(tex_coords) = raw.tex_coords.as_ref().and_then(|t| t.get(i)) {
                    vertex.tex_coords = *tex_coords;
                    if let Some(tangent) = raw.tangents.as_ref().and_then(|t| t.get(i)) {
                        vertex.tangent = *tangent;
                    }
                    if let Some(bitangent) = raw.bitangents.as_ref().and_then(|b| b.get(i)) {
                        vertex.bitangent = *bitangent;
                    }
                }
                vertex
            })
            .collect();

        let indices = raw
            .faces
            .iter()
            .flat_map(|face| face.indices.iter().copied())
            .collect();

        let textures = match self.scene.material(raw.material_index) {
            Some(material) => self.load_material_textures(material, gpu),
            None => {
                log::warn!(
                    "Mesh {:?} refers to missing material {}.",
                    raw.name,
                    raw.material_index
                );
                Vec::new()
            }
        };

        Mesh::new(raw.name.clone(), vertices, indices, textures, gpu)
    }

    fn load_material_textures<U: TextureUploader + ?Sized>(
        &mut self,
        material: &RawMaterial,
        uploader: &mut U,
    ) -> Vec<TextureRef> {
        let mut textures = Vec::new();
        for (category, role) in self.options.role_map.iter() {
            for path in material.textures_of(category) {
                // a cached texture is reused as is, including the role it was first loaded as
                let texture = match self.textures_loaded.get(path) {
                    Some(loaded) => loaded.clone(),
                    None => {
                        let texture = TextureRef {
                            handle: self.upload(path, role, uploader),
                            role,
                            path: path.to_string(),
                        };
                        self.textures_loaded.insert(texture.clone());
                        texture
                    }
                };
                textures.push(texture);
            }
        }
        textures
    }

    fn upload<U: TextureUploader + ?Sized>(
        &self,
        path: &str,
        role: TextureRole,
        uploader: &mut U,
    ) -> TextureHandle {
        let srgb = self.options.gamma_correction && role == TextureRole::Diffuse;
        match self.scene.embedded_textures.get(path) {
            Some(bytes) => texture_from_embedded(path, bytes, self.decoder, uploader, srgb),
            None => texture_from_file(path, self.directory, self.decoder, uploader, srgb),
        }
    }
}
