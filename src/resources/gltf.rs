use std::{collections::HashMap, path::Path};

use anyhow::Context;
use cgmath::Vector3;

use crate::{
    data_structures::scene_graph::{
        Face, ImportedScene, RawMaterial, RawMesh, SceneNode, TextureCategory,
    },
    resources::ImportFlags,
};

/**
 * glTF 2.0 import (`.gltf` with external or embedded buffers, and `.glb`).
 *
 * Every primitive becomes its own raw mesh, and a node that instances a glTF
 * mesh refers to all of that mesh's primitives. Images stored in buffer views
 * are handed over as encoded bytes under the path `*<image index>`.
 *
 * Texture coordinates are moved to a bottom-left origin here so that the
 * `flip_uvs` step treats obj and glTF the same way.
 */
pub fn import(path: &Path, _flags: &ImportFlags) -> anyhow::Result<ImportedScene> {
    let gltf::Gltf { document, blob } =
        gltf::Gltf::open(path).with_context(|| format!("Failed to parse gltf file: {:?}", path))?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let buffers = gltf::import_buffers(&document, Some(base), blob)
        .with_context(|| format!("Failed to load buffers of {:?}", path))?;

    let mut scene = ImportedScene::default();

    // Load materials
    let mut embedded_textures = HashMap::new();
    for material in document.materials() {
        scene
            .materials
            .push(convert_material(&material, &buffers, &mut embedded_textures));
    }
    scene.embedded_textures = embedded_textures;
    let default_material = scene.materials.len();
    scene.materials.push(RawMaterial::new("DefaultMaterial"));

    // Load meshes, one raw mesh per primitive
    let mut primitives_of_mesh: Vec<Vec<usize>> = Vec::with_capacity(document.meshes().len());
    for mesh in document.meshes() {
        let mut indices = Vec::new();
        for primitive in mesh.primitives() {
            let name = match mesh.name() {
                Some(name) => format!("{}.{}", name, primitive.index()),
                None => format!("mesh{}.{}", mesh.index(), primitive.index()),
            };
            match convert_primitive(&primitive, &buffers, name) {
                Some(mut raw) => {
                    raw.material_index = primitive.material().index().unwrap_or(default_material);
                    indices.push(scene.meshes.len());
                    scene.meshes.push(raw);
                }
                None => {
                    log::warn!(
                        "Primitive {} of mesh {} has no positions and is skipped.",
                        primitive.index(),
                        mesh.index()
                    );
                    scene.incomplete = true;
                }
            }
        }
        primitives_of_mesh.push(indices);
    }

    let gltf_scene = document.default_scene().or_else(|| document.scenes().next());
    scene.root = gltf_scene.map(|s| {
        let name = s.name().map_or_else(|| format!("scene{}", s.index()), str::to_string);
        s.nodes().fold(SceneNode::new(name), |root, node| {
            root.with_child(convert_node(&node, &primitives_of_mesh))
        })
    });

    if scene.meshes.is_empty() {
        scene.incomplete = true;
    }
    Ok(scene)
}

fn convert_node(node: &gltf::Node, primitives_of_mesh: &[Vec<usize>]) -> SceneNode {
    let name = node.name().map_or_else(|| format!("node{}", node.index()), str::to_string);
    let meshes = node
        .mesh()
        .and_then(|m| primitives_of_mesh.get(m.index()))
        .cloned()
        .unwrap_or_default();

    let mut scene_node = SceneNode::new(name).with_meshes(meshes);
    for child in node.children() {
        scene_node.children.push(convert_node(&child, primitives_of_mesh));
    }
    scene_node
}

fn convert_primitive(
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
    name: String,
) -> Option<RawMesh> {
    let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

    let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
    let vertex_count = positions.len();
    let normals = per_vertex(
        reader.read_normals().map(|n| n.collect()),
        vertex_count,
        "normals",
        &name,
    );
    let tex_coords = per_vertex(
        reader
            .read_tex_coords(0)
            .map(|t| t.into_f32().map(|[u, v]| [u, 1.0 - v]).collect()),
        vertex_count,
        "texture coordinates",
        &name,
    );

    // Bitangents follow from the normal and the handedness stored in w.
    let (tangents, bitangents) = match (reader.read_tangents(), normals.as_ref()) {
        (Some(tangents), Some(normals)) => {
            let (t, b): (Vec<[f32; 3]>, Vec<[f32; 3]>) = tangents
                .zip(normals)
                .map(|([x, y, z, w], n)| {
                    let tangent = Vector3::new(x, y, z);
                    let t: [f32; 3] = tangent.into();
                    let b: [f32; 3] = (Vector3::from(*n).cross(tangent) * w).into();
                    (t, b)
                })
                .unzip();
            (
                per_vertex(Some(t), vertex_count, "tangents", &name),
                per_vertex(Some(b), vertex_count, "bitangents", &name),
            )
        }
        _ => (None, None),
    };

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertex_count as u32).collect(),
    };

    Some(RawMesh {
        name,
        positions,
        normals,
        tex_coords,
        tangents,
        bitangents,
        faces: faces_for_mode(primitive.mode(), &indices),
        material_index: 0,
    })
}

/// Keeps an optional attribute only if it has exactly one entry per position.
fn per_vertex<T>(
    attribute: Option<Vec<T>>,
    vertex_count: usize,
    what: &str,
    mesh: &str,
) -> Option<Vec<T>> {
    match attribute {
        Some(values) if values.len() != vertex_count => {
            log::warn!(
                "Primitive {} has {} {} for {} positions; they are ignored.",
                mesh,
                values.len(),
                what,
                vertex_count
            );
            None
        }
        other => other,
    }
}

/// Splits an index list into faces according to the primitive topology.
fn faces_for_mode(mode: gltf::mesh::Mode, indices: &[u32]) -> Vec<Face> {
    use gltf::mesh::Mode;

    match mode {
        Mode::Triangles => indices
            .chunks_exact(3)
            .map(|c| Face::triangle(c[0], c[1], c[2]))
            .collect(),
        Mode::TriangleStrip => indices
            .windows(3)
            .enumerate()
            .map(|(i, w)| {
                // keep the winding consistent on odd triangles
                if i % 2 == 0 {
                    Face::triangle(w[0], w[1], w[2])
                } else {
                    Face::triangle(w[1], w[0], w[2])
                }
            })
            .collect(),
        Mode::TriangleFan => match indices.split_first() {
            Some((&first, rest)) => rest
                .windows(2)
                .map(|w| Face::triangle(first, w[0], w[1]))
                .collect(),
            None => Vec::new(),
        },
        Mode::Points => indices.iter().map(|&i| Face::from(vec![i])).collect(),
        Mode::Lines => indices.chunks_exact(2).map(|c| Face::from(c.to_vec())).collect(),
        Mode::LineStrip => indices.windows(2).map(|w| Face::from(w.to_vec())).collect(),
        Mode::LineLoop => {
            let mut faces: Vec<Face> = indices.windows(2).map(|w| Face::from(w.to_vec())).collect();
            if let (Some(&first), Some(&last)) = (indices.first(), indices.last()) {
                if indices.len() > 2 {
                    faces.push(Face::from(vec![last, first]));
                }
            }
            faces
        }
    }
}

fn convert_material(
    material: &gltf::Material,
    buffers: &[gltf::buffer::Data],
    embedded: &mut HashMap<String, Vec<u8>>,
) -> RawMaterial {
    let name = material.name().map_or_else(
        || format!("material{}", material.index().unwrap_or_default()),
        str::to_string,
    );
    let pbr = material.pbr_metallic_roughness();

    let slots = [
        (TextureCategory::Diffuse, pbr.base_color_texture().map(|t| t.texture())),
        (TextureCategory::Normals, material.normal_texture().map(|t| t.texture())),
        (TextureCategory::Lightmap, material.occlusion_texture().map(|t| t.texture())),
        (TextureCategory::Emissive, material.emissive_texture().map(|t| t.texture())),
        (TextureCategory::Metalness, pbr.metallic_roughness_texture().map(|t| t.texture())),
    ];

    let mut raw = RawMaterial::new(name);
    for (category, texture) in slots {
        if let Some(path) = texture.and_then(|t| image_path(&t.source(), buffers, embedded)) {
            raw = raw.with_texture(category, path);
        }
    }
    raw
}

/// Path a material uses for `image`; embedded images are copied into `embedded`.
fn image_path(
    image: &gltf::Image,
    buffers: &[gltf::buffer::Data],
    embedded: &mut HashMap<String, Vec<u8>>,
) -> Option<String> {
    match image.source() {
        gltf::image::Source::Uri { uri, .. } => {
            if uri.starts_with("data:") {
                log::warn!("Image {} uses a data uri, which is not supported.", image.index());
                return None;
            }
            Some(percent_decode(uri))
        }
        gltf::image::Source::View { view, .. } => {
            let path = format!("*{}", image.index());
            if !embedded.contains_key(&path) {
                let data = &buffers[view.buffer().index()];
                let start = view.offset();
                let end = start + view.length();
                match data.get(start..end) {
                    Some(bytes) => {
                        embedded.insert(path.clone(), bytes.to_vec());
                    }
                    None => {
                        log::warn!("Image {} points outside of its buffer.", image.index());
                        return None;
                    }
                }
            }
            Some(path)
        }
    }
}

/// Decodes `%XX` escapes of a relative uri. Malformed escapes are kept verbatim.
fn percent_decode(uri: &str) -> String {
    let bytes = uri.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3).and_then(|h| std::str::from_utf8(h).ok());
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
