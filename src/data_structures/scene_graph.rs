//! Imported scene graphs.
//!
//! This is the shape every importer produces before a [`Model`](super::model::Model)
//! flattens it: a tree of [`SceneNode`]s that refer to [`RawMesh`] records by
//! index, and raw meshes that refer to [`RawMaterial`]s by index. Nothing in
//! here touches the GPU.

use std::collections::HashMap;

/// Material texture slots as importers report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureCategory {
    Diffuse,
    Specular,
    Ambient,
    Emissive,
    Height,
    Normals,
    Shininess,
    Opacity,
    Lightmap,
    Metalness,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMaterial {
    pub name: String,
    /// `(category, path)` in declaration order.
    pub textures: Vec<(TextureCategory, String)>,
}

impl RawMaterial {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            textures: Vec::new(),
        }
    }

    pub fn with_texture(mut self, category: TextureCategory, path: impl Into<String>) -> Self {
        self.textures.push((category, path.into()));
        self
    }

    pub fn texture_count(&self, category: TextureCategory) -> usize {
        self.textures_of(category).count()
    }

    pub fn textures_of(&self, category: TextureCategory) -> impl Iterator<Item = &str> {
        self.textures
            .iter()
            .filter(move |(c, _)| *c == category)
            .map(|(_, path)| path.as_str())
    }
}

/// One polygon (or point/line) of a raw mesh, as indices into its vertex arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Face {
    pub indices: Vec<u32>,
}

impl Face {
    pub fn triangle(a: u32, b: u32, c: u32) -> Self {
        Self {
            indices: vec![a, b, c],
        }
    }
}

impl From<Vec<u32>> for Face {
    fn from(indices: Vec<u32>) -> Self {
        Self { indices }
    }
}

/// Mesh data exactly as imported. Optional attributes are either absent or
/// have one entry per position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    /// First texture coordinate set; further sets are not imported.
    pub tex_coords: Option<Vec<[f32; 2]>>,
    pub tangents: Option<Vec<[f32; 3]>>,
    pub bitangents: Option<Vec<[f32; 3]>>,
    pub faces: Vec<Face>,
    pub material_index: usize,
}

impl RawMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn has_tangents_and_bitangents(&self) -> bool {
        self.tangents.is_some() && self.bitangents.is_some()
    }
}

/// A node of the imported hierarchy, referring to meshes of the owning [`ImportedScene`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub meshes: Vec<usize>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_meshes(mut self, meshes: impl IntoIterator<Item = usize>) -> Self {
        self.meshes.extend(meshes);
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SceneNode::node_count).sum::<usize>()
    }
}

/// The result of an asset import.
#[derive(Debug, Clone, Default)]
pub struct ImportedScene {
    pub root: Option<SceneNode>,
    pub meshes: Vec<RawMesh>,
    pub materials: Vec<RawMaterial>,
    /// Encoded images stored inside the asset, keyed by the `*<n>` paths materials use for them.
    pub embedded_textures: HashMap<String, Vec<u8>>,
    /// Set by importers when the asset could only be read partially.
    pub incomplete: bool,
}

impl ImportedScene {
    /// Calls `visit` for every mesh reference in depth-first order: a node's own
    /// meshes come before anything in its children.
    ///
    /// References to meshes that do not exist are skipped with a warning.
    pub fn visit_meshes<'s>(&'s self, visit: &mut dyn FnMut(&'s SceneNode, &'s RawMesh)) {
        if let Some(root) = &self.root {
            self.visit_node(root, visit);
        }
    }

    fn visit_node<'s>(
        &'s self,
        node: &'s SceneNode,
        visit: &mut dyn FnMut(&'s SceneNode, &'s RawMesh),
    ) {
        for &mesh_idx in &node.meshes {
            match self.meshes.get(mesh_idx) {
                Some(mesh) => visit(node, mesh),
                None => log::warn!(
                    "Node {:?} refers to mesh {} but the scene only has {} meshes.",
                    node.name,
                    mesh_idx,
                    self.meshes.len()
                ),
            }
        }
        for child in &node.children {
            self.visit_node(child, visit);
        }
    }

    pub fn material(&self, idx: usize) -> Option<&RawMaterial> {
        self.materials.get(idx)
    }

    pub fn node_count(&self) -> usize {
        self.root.as_ref().map_or(0, SceneNode::node_count)
    }
}
