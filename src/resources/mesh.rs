use cgmath::{InnerSpace, Vector2, Vector3, Zero};

use crate::{
    data_structures::scene_graph::{Face, ImportedScene, RawMesh},
    resources::ImportFlags,
};

/// Runs the post-processing steps selected in `flags` on every mesh of `scene`.
///
/// Order matters: faces are triangulated first so normals and tangents are
/// computed from triangles, and UVs are flipped before tangents are derived.
pub fn post_process(scene: &mut ImportedScene, flags: &ImportFlags) {
    for mesh in scene.meshes.iter_mut() {
        if flags.triangulate {
            triangulate(mesh);
        }
        if flags.gen_smooth_normals && mesh.normals.is_none() {
            generate_smooth_normals(mesh);
        }
        if flags.flip_uvs {
            flip_uvs(mesh);
        }
        if flags.calc_tangent_space
            && mesh.tex_coords.is_some()
            && !mesh.has_tangents_and_bitangents()
        {
            calculate_tangent_space(mesh);
        }
    }
}

/// Fan-triangulates faces with more than three indices. Points and lines stay as they are.
pub fn triangulate(mesh: &mut RawMesh) {
    if mesh.faces.iter().all(|f| f.indices.len() <= 3) {
        return;
    }
    let faces = std::mem::take(&mut mesh.faces);
    for face in faces {
        match face.indices.as_slice() {
            [first, rest @ ..] if rest.len() > 2 => {
                for pair in rest.windows(2) {
                    mesh.faces.push(Face::triangle(*first, pair[0], pair[1]));
                }
            }
            _ => mesh.faces.push(face),
        }
    }
}

/// Area-weighted average of the normals of all triangles touching each vertex.
pub fn generate_smooth_normals(mesh: &mut RawMesh) {
    let mut normals = vec![Vector3::<f32>::zero(); mesh.positions.len()];

    for tri in triangles(mesh) {
        let [p0, p1, p2] = tri.map(|i| Vector3::from(mesh.positions[i]));
        // the cross product's length is twice the triangle area
        let face_normal = (p1 - p0).cross(p2 - p0);
        for i in tri {
            normals[i] += face_normal;
        }
    }

    mesh.normals = Some(
        normals
            .into_iter()
            .map(|n| {
                if n.magnitude2() > f32::EPSILON {
                    n.normalize().into()
                } else {
                    [0.0; 3]
                }
            })
            .collect(),
    );
}

/// Moves texture coordinates between bottom-left and top-left origin.
pub fn flip_uvs(mesh: &mut RawMesh) {
    if let Some(tex_coords) = mesh.tex_coords.as_mut() {
        for uv in tex_coords.iter_mut() {
            uv[1] = 1.0 - uv[1];
        }
    }
}

/**
 * Tangents and bitangents are solved per triangle from its edges and UV deltas
 * and then averaged over every triangle a vertex belongs to.
 *
 * Triangles whose UVs are degenerate (zero area in texture space) don't contribute.
 */
pub fn calculate_tangent_space(mesh: &mut RawMesh) {
    let Some(tex_coords) = mesh.tex_coords.as_ref() else {
        return;
    };
    let vertex_count = mesh.positions.len();
    if tex_coords.len() != vertex_count {
        log::warn!(
            "Mesh {:?} has {} texture coordinates for {} positions; no tangent space generated.",
            mesh.name,
            tex_coords.len(),
            vertex_count
        );
        return;
    }
    let mut tangents = vec![Vector3::<f32>::zero(); vertex_count];
    let mut bitangents = vec![Vector3::<f32>::zero(); vertex_count];
    let mut triangles_included = vec![0u32; vertex_count];

    for tri in triangles(mesh) {
        let [pos0, pos1, pos2] = tri.map(|i| Vector3::from(mesh.positions[i]));
        let [uv0, uv1, uv2] = tri.map(|i| Vector2::from(tex_coords[i]));

        // Calculate the edges of the triangle
        let delta_pos1 = pos1 - pos0;
        let delta_pos2 = pos2 - pos0;

        let delta_uv1 = uv1 - uv0;
        let delta_uv2 = uv2 - uv0;

        // Solving
        //     delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
        //     delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
        let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
        if det.abs() <= f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;
        let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
        let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * r;

        for i in tri {
            tangents[i] += tangent;
            bitangents[i] += bitangent;
            triangles_included[i] += 1;
        }
    }

    // Average the tangents/bitangents
    let average = |sum: Vector3<f32>, n: u32| -> [f32; 3] {
        if n == 0 {
            [0.0; 3]
        } else {
            (sum / n as f32).into()
        }
    };
    mesh.tangents = Some(
        tangents
            .into_iter()
            .zip(&triangles_included)
            .map(|(t, &n)| average(t, n))
            .collect(),
    );
    mesh.bitangents = Some(
        bitangents
            .into_iter()
            .zip(&triangles_included)
            .map(|(b, &n)| average(b, n))
            .collect(),
    );
}

/// Triangles of `mesh` whose indices are all in range.
fn triangles(mesh: &RawMesh) -> impl Iterator<Item = [usize; 3]> + '_ {
    let vertex_count = mesh.positions.len();
    mesh.faces.iter().filter_map(move |face| match face.indices.as_slice() {
        &[a, b, c] => {
            let tri = [a as usize, b as usize, c as usize];
            tri.iter().all(|&i| i < vertex_count).then_some(tri)
        }
        _ => None,
    })
}
