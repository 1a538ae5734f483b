//! Shared fixtures for integration tests

#![allow(dead_code)]

/// Minimal GLB holding one triangle spanning `size` units on X and Y
pub fn triangle_glb(size: f32) -> Vec<u8> {
    let positions: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [size, 0.0, 0.0], [0.0, size, 0.0]];
    let bin: Vec<u8> = positions
        .iter()
        .flatten()
        .flat_map(|f| f.to_le_bytes())
        .collect();

    let mut json = format!(
        concat!(
            r#"{{"asset":{{"version":"2.0"}},"#,
            r#""buffers":[{{"byteLength":36}}],"#,
            r#""bufferViews":[{{"buffer":0,"byteOffset":0,"byteLength":36}}],"#,
            r#""accessors":[{{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","#,
            r#""min":[0,0,0],"max":[{s},{s},0]}}],"#,
            r#""meshes":[{{"primitives":[{{"attributes":{{"POSITION":0}}}}]}}],"#,
            r#""nodes":[{{"mesh":0}}],"scenes":[{{"nodes":[0]}}],"scene":0}}"#
        ),
        s = size
    )
    .into_bytes();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"JSON");
    glb.extend_from_slice(&json);
    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"BIN\0");
    glb.extend_from_slice(&bin);
    glb
}

/// PNG of the given size
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([0, 128, 255, 255]));
    let mut data = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut data), image::ImageOutputFormat::Png)
        .expect("Failed to encode test image");
    data
}

/// Raw collectible record as returned by the ledger
pub fn record(id: &str, name: &str, fields: serde_json::Value) -> serde_json::Value {
    let mut record = serde_json::json!({ "id": id, "name": name });
    if let (Some(target), Some(extra)) = (record.as_object_mut(), fields.as_object()) {
        for (key, value) in extra {
            target.insert(key.clone(), value.clone());
        }
    }
    record
}
