#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::{
        bake::{bake, bake_document, output_paths, transcode, INDEX_VIEW, VERTEX_SIZE, VERTEX_VIEW},
        helpers::BakeError,
        render::{read_baked, BakedScene},
        scene::{
            AccessorView, ATTR_NORMAL, ATTR_POSITION, ATTR_TANGENT, ATTR_TEXCOORD_0,
            COMPONENT_FLOAT, EXT_MESH_QUANTIZATION, TARGET_ARRAY_BUFFER,
            TARGET_ELEMENT_ARRAY_BUFFER,
        },
        tests::{single_triangle_scene, PrimitiveData, SceneBuilder},
        world::Config,
    };

    fn unit(rng: &mut StdRng) -> [f32; 3] {
        loop {
            let v: [f32; 3] = [
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            ];
            let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
            if len > 0.1 {
                return v.map(|c| c / len);
            }
        }
    }

    fn random_primitive(rng: &mut StdRng, vertex_count: usize, triangles: usize) -> PrimitiveData {
        let mut data = PrimitiveData::default();
        for _ in 0..vertex_count {
            data.positions.push([
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
            ]);
            data.normals.push(unit(rng));
            let t = unit(rng);
            let w = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            data.tangents.push([t[0], t[1], t[2], w]);
            data.texcoords.push([rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0)]);
        }
        for _ in 0..triangles * 3 {
            data.indices.push(rng.gen_range(0..vertex_count as u16));
        }
        data
    }

    #[test]
    fn single_triangle_bakes_to_one_render_element() {
        let (document, buffers) = single_triangle_scene();
        let asset = bake_document(&document, &buffers, "tri.bin", None, false).unwrap();

        let scene = &asset.scene;
        assert_eq!(scene.render_elements.len(), 1);
        assert_eq!(scene.meshes.len(), 1);
        assert_eq!(scene.meshes[0].relem_count, 1);
        let relem = &scene.render_elements[0];
        assert_eq!((relem.vertex_count, relem.index_count), (3, 3));
        assert_eq!((relem.vertex_offset, relem.index_offset), (0, 0));

        let doc = &asset.document;
        assert_eq!(doc.buffers.len(), 1);
        assert_eq!(doc.buffers[0].uri.as_deref(), Some("tri.bin"));
        assert_eq!(doc.buffers[0].byte_length, 12 + 3 * VERTEX_SIZE);
        assert_eq!(asset.blob.len(), 12 + 3 * VERTEX_SIZE);

        let index_view = &doc.buffer_views[INDEX_VIEW];
        let vertex_view = &doc.buffer_views[VERTEX_VIEW];
        assert_eq!(index_view.byte_offset, 0);
        assert_eq!(index_view.target, Some(TARGET_ELEMENT_ARRAY_BUFFER));
        assert_eq!(vertex_view.byte_offset, 12);
        assert_eq!(vertex_view.byte_stride, Some(VERTEX_SIZE));
        assert_eq!(vertex_view.target, Some(TARGET_ARRAY_BUFFER));

        // one index accessor plus the four attributes
        assert_eq!(doc.accessors.len(), 5);
        let primitive = &doc.meshes[0].primitives[0];
        for key in [ATTR_POSITION, ATTR_NORMAL, ATTR_TANGENT, ATTR_TEXCOORD_0] {
            assert!(primitive.attribute(key).is_some(), "{key} missing");
        }
        let position = &doc.accessors[primitive.attribute(ATTR_POSITION).unwrap()];
        assert_eq!(position.min, Some(vec![0.0, 0.0, 0.0]));
        assert_eq!(position.max, Some(vec![1.0, 1.0, 0.0]));

        assert!(doc.extensions_used.iter().any(|e| e == EXT_MESH_QUANTIZATION));
        assert!(doc.extensions_required.iter().any(|e| e == EXT_MESH_QUANTIZATION));
    }

    #[test]
    fn non_triangle_primitives_are_skipped() {
        let mut builder = SceneBuilder::new();
        let triangle = PrimitiveData::triangle().add_to(&mut builder);
        let mut strip = PrimitiveData::triangle().add_to(&mut builder);
        strip.mode = 3;
        builder.mesh(vec![strip, triangle], [0.0; 3]);
        let (document, buffers) = builder.finish();

        let asset = bake_document(&document, &buffers, "mixed.bin", None, true).unwrap();
        assert_eq!(asset.scene.meshes[0].relem_count, 1);
        assert_eq!(asset.scene.render_elements.len(), 1);
        assert_eq!(asset.scene.render_elements[0].index_count, 3);

        let primitives = &asset.document.meshes[0].primitives;
        assert_eq!(primitives.len(), 1);
        assert!(primitives[0].is_triangle_list());
    }

    #[test]
    fn missing_position_rejects_the_bake() {
        let mut builder = SceneBuilder::new();
        let good = PrimitiveData::triangle().add_to(&mut builder);
        let mut bad = PrimitiveData::triangle().add_to(&mut builder);
        bad.attributes.remove(ATTR_POSITION);
        builder.mesh(vec![good.clone()], [0.0; 3]);
        builder.mesh(vec![good, bad], [0.0; 3]);
        let (document, buffers) = builder.finish();

        let err = bake_document(&document, &buffers, "x.bin", None, false).unwrap_err();
        assert!(matches!(
            err,
            BakeError::MissingPosition {
                mesh: 1,
                primitive: 1
            }
        ));
    }

    #[test]
    fn float_indices_reject_the_bake() {
        let (mut document, buffers) = single_triangle_scene();
        let indices = document.meshes[0].primitives[0].indices.unwrap();
        document.accessors[indices].component_type = COMPONENT_FLOAT;

        let err = bake_document(&document, &buffers, "x.bin", None, false).unwrap_err();
        assert!(matches!(
            err,
            BakeError::UnsupportedIndexType {
                mesh: 0,
                primitive: 0,
                component_type: COMPONENT_FLOAT
            }
        ));
    }

    #[test]
    fn oversized_position_counts_reject_the_bake() {
        let (mut document, buffers) = single_triangle_scene();
        let position = document.meshes[0].primitives[0].attributes[ATTR_POSITION];
        let accessor = &mut document.accessors[position];
        accessor.count = (1 << 62) + 1;
        accessor.min = None;
        accessor.max = None;

        let err = transcode(&document, &buffers, false).unwrap_err();
        assert!(matches!(err, BakeError::AccessorOutOfBounds { .. }));

        // without a buffer view the count alone must be rejected
        document.accessors[position].buffer_view = None;
        let err = transcode(&document, &buffers, false).unwrap_err();
        assert!(matches!(err, BakeError::InvalidInput(_)));
    }

    #[test]
    fn primitives_without_indices_get_sequential_ones() {
        let mut builder = SceneBuilder::new();
        let mut data = PrimitiveData::triangle();
        data.indices.clear();
        data.normals.clear();
        data.tangents.clear();
        let primitive = data.add_to(&mut builder);
        builder.mesh(vec![primitive], [0.0; 3]);
        let (document, buffers) = builder.finish();

        let scene = transcode(&document, &buffers, false).unwrap();
        assert_eq!(scene.indices, vec![0, 1, 2]);
        let attributes = scene.render_elements[0].attributes;
        assert!(!attributes.normal && !attributes.tangent && attributes.texcoord);
        // absent streams bake as zero
        assert_eq!(scene.vertices[1].normal(), [0, 0, 0, 0]);
    }

    #[test]
    fn baked_attributes_round_trip_within_quantization_error() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut builder = SceneBuilder::new();
        let mut sources = Vec::new();
        for mesh in 0..4 {
            let mut primitives = Vec::new();
            for _ in 0..=mesh % 2 {
                let vertices = rng.gen_range(3..40);
                let triangles = rng.gen_range(1..20);
                let data = random_primitive(&mut rng, vertices, triangles);
                primitives.push(data.add_to(&mut builder));
                sources.push(data);
            }
            builder.mesh(primitives, [mesh as f32, 0.0, 0.0]);
        }
        let (document, buffers) = builder.finish();

        let asset = bake_document(&document, &buffers, "rt.bin", None, true).unwrap();
        let baked_buffers = vec![asset.blob.clone()];
        let document = &asset.document;
        let blob = &baked_buffers;
        let baked_primitives = document.meshes.iter().flat_map(|m| m.primitives.iter());

        let tolerance = 1.0 / 127.0 + 1e-6;
        for (source, primitive) in sources.iter().zip(baked_primitives) {
            let view = move |key: &str| {
                AccessorView::new(document, blob, primitive.attribute(key).unwrap()).unwrap()
            };
            let positions = view(ATTR_POSITION);
            let normals = view(ATTR_NORMAL);
            let tangents = view(ATTR_TANGENT);
            let texcoords = view(ATTR_TEXCOORD_0);
            assert_eq!(positions.count, source.positions.len());

            for i in 0..positions.count {
                assert_eq!(positions.read_f32::<3>(i), source.positions[i]);
                assert_eq!(texcoords.read_f32::<2>(i), source.texcoords[i]);
                let n = normals.read_f32::<3>(i);
                let t = tangents.read_f32::<4>(i);
                for c in 0..3 {
                    assert!((n[c] - source.normals[i][c]).abs() <= tolerance);
                }
                for c in 0..4 {
                    assert!((t[c] - source.tangents[i][c]).abs() <= tolerance);
                }
            }

            let indices = AccessorView::new(document, blob, primitive.indices.unwrap()).unwrap();
            let mut out = vec![0u32; indices.count];
            indices.copy_indices(&mut out).unwrap();
            let expected: Vec<u32> = source.indices.iter().map(|&i| i as u32).collect();
            assert_eq!(out, expected);
            assert_eq!(out.len() / 3, source.indices.len() / 3);
        }
    }

    #[test]
    fn baking_a_baked_asset_is_byte_identical() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut builder = SceneBuilder::new();
        for _ in 0..3 {
            let data = random_primitive(&mut rng, 12, 6);
            let primitive = data.add_to(&mut builder);
            builder.mesh(vec![primitive], [0.0; 3]);
        }
        let (document, buffers) = builder.finish();

        let first = bake_document(&document, &buffers, "scene.bin", None, true).unwrap();
        let second = bake_document(
            &first.document,
            &[first.blob.clone()],
            "scene.bin",
            None,
            true,
        )
        .unwrap();

        assert_eq!(first.blob, second.blob);
        assert_eq!(first.document, second.document);
        assert_eq!(
            serde_json::to_vec(&first.document).unwrap(),
            serde_json::to_vec(&second.document).unwrap()
        );
    }

    #[test]
    fn ranges_stay_inside_the_baked_buffers() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut builder = SceneBuilder::new();
        for _ in 0..8 {
            let count = rng.gen_range(1..4);
            let primitives = (0..count)
                .map(|_| {
                    let vertices = rng.gen_range(3..30);
                    let triangles = rng.gen_range(1..10);
                    random_primitive(&mut rng, vertices, triangles).add_to(&mut builder)
                })
                .collect();
            builder.mesh(primitives, [0.0; 3]);
        }
        let (document, buffers) = builder.finish();

        let parallel = transcode(&document, &buffers, true).unwrap();
        let sequential = transcode(&document, &buffers, false).unwrap();

        let vertices = parallel.vertices.len() as u32;
        let indices = parallel.indices.len() as u32;
        for relem in &parallel.render_elements {
            assert!(relem.vertex_offset + relem.vertex_count <= vertices);
            assert!(relem.index_offset + relem.index_count <= indices);
        }
        for mesh in &parallel.meshes {
            assert!(mesh.first_relem + mesh.relem_count <= parallel.render_elements.len() as u32);
        }

        assert_eq!(parallel.indices, sequential.indices);
        assert_eq!(parallel.render_elements, sequential.render_elements);
        let a: &[u8] = bytemuck::cast_slice(&parallel.vertices);
        let b: &[u8] = bytemuck::cast_slice(&sequential.vertices);
        assert_eq!(a, b);
    }

    #[test]
    fn skins_and_animations_are_dropped() {
        let (mut document, buffers) = single_triangle_scene();
        document
            .extra
            .insert("animations".into(), serde_json::json!([{"channels": []}]));
        document.extra.insert("skins".into(), serde_json::json!([{"joints": [0]}]));
        document.nodes[0].extra.insert("skin".into(), serde_json::json!(0));
        document.extensions_used.push(EXT_MESH_QUANTIZATION.to_string());

        let asset = bake_document(&document, &buffers, "x.bin", None, false).unwrap();
        assert!(!asset.document.extra.contains_key("animations"));
        assert!(!asset.document.extra.contains_key("skins"));
        assert!(!asset.document.nodes[0].extra.contains_key("skin"));
        assert_eq!(
            asset
                .document
                .extensions_used
                .iter()
                .filter(|e| e.as_str() == EXT_MESH_QUANTIZATION)
                .count(),
            1
        );
    }

    #[test]
    fn embedded_images_lose_their_buffer_views() {
        let (mut document, buffers) = single_triangle_scene();
        document.extra.insert(
            "images".into(),
            serde_json::json!([
                {"bufferView": 0, "mimeType": "image/png", "name": "embedded"},
                {"uri": "albedo.png"}
            ]),
        );

        let asset = bake_document(&document, &buffers, "x.bin", None, false).unwrap();
        assert_eq!(
            asset.document.extra["images"],
            serde_json::json!([{"name": "embedded"}, {"uri": "albedo.png"}])
        );
    }

    #[test]
    fn bake_writes_files_the_scene_manager_can_load() {
        let dir = std::env::temp_dir().join(format!("meshbake-bake-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let (mut document, buffers) = single_triangle_scene();
        document.buffers[0].uri = Some("tri.bin".to_string());
        let source = dir.join("tri.gltf");
        std::fs::write(dir.join("tri.bin"), &buffers[0]).unwrap();
        std::fs::write(&source, serde_json::to_vec(&document).unwrap()).unwrap();

        let config = Config::default();
        let output = bake(&source, &config).unwrap();
        assert_eq!(output.gltf_path, dir.join("tri_baked.gltf"));
        assert_eq!(output.bin_path, dir.join("tri_baked.bin"));
        assert_eq!(output.render_elements, 1);

        let baked = BakedScene::load(&output.gltf_path).unwrap();
        let raw = BakedScene::open(&source, false).unwrap();
        assert_eq!(baked.render_elements, raw.render_elements);
        assert_eq!(baked.indices, raw.indices);
        assert_eq!(baked.instance_meshes, vec![0]);
        assert_eq!(baked.mesh_bounds[0].max.x, 1.0);

        // the unbaked source is not a baked layout
        assert!(matches!(
            BakedScene::load(&source),
            Err(BakeError::InvalidBakedLayout(_))
        ));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn baked_counts_past_32_bits_are_not_truncated() {
        let (document, buffers) = single_triangle_scene();
        let mut asset = bake_document(&document, &buffers, "x.bin", None, false).unwrap();
        let scene = read_baked(&asset.document, &asset.blob).unwrap();
        assert_eq!(scene.render_elements[0].vertex_count, 3);

        let position = asset.document.meshes[0].primitives[0].attributes[ATTR_POSITION];
        asset.document.accessors[position].count = (1 << 32) + 3;
        assert!(matches!(
            read_baked(&asset.document, &asset.blob),
            Err(BakeError::InvalidBakedLayout(_))
        ));
    }

    #[test]
    fn failed_load_writes_nothing() {
        let dir = std::env::temp_dir().join(format!("meshbake-fail-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let source = dir.join("scene.obj");
        std::fs::write(&source, b"v 0 0 0").unwrap();

        let err = bake(&source, &Config::default()).unwrap_err();
        assert!(matches!(err, BakeError::UnsupportedFormat(_)));
        let (gltf, bin) = output_paths(&source, "_baked").unwrap();
        assert!(!gltf.exists());
        assert!(!bin.exists());

        std::fs::remove_dir_all(&dir).ok();
    }
}
