use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fovy_deg: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fovy_deg: 60.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upper bound on instance buffer slots per frame.
    pub max_drawn_instances: usize,
    /// Appended to the source stem for the baked `.gltf`/`.bin` pair.
    pub output_suffix: String,
    pub pretty_json: bool,
    pub parallel_transcode: bool,
    pub camera: CameraConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_drawn_instances: 4096,
            output_suffix: "_baked".to_string(),
            pretty_json: true,
            parallel_transcode: true,
            camera: CameraConfig::default(),
        }
    }
}
