use std::{collections::HashMap, sync::Arc};

use lantern_core::{ClusterConfig, LIGHT_TEXTURE_HEIGHT, ShadingMode};
use lantern_shading::{AMBIENT_LIGHT, SPECULAR_EXPONENT, SpecularAccumulation};

pub mod cluster_program;

pub use cluster_program::{ClusterDrawData, ClusterProgram, ForwardVertex};

const PRELUDE: &str = include_str!("programs/prelude.wgsl");
const DEFERRED: &str = include_str!("programs/deferred.wgsl");
const FORWARD_PLUS: &str = include_str!("programs/forward_plus.wgsl");

/// Holds common WGPU references to simplify function signatures.
pub struct GpuProgramRenderContext<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub format: wgpu::TextureFormat, // The output format
}

pub trait GpuProgram {
    /// Data required to initialize the pipeline (e.g., shared layouts)
    type InitData<'a>;

    /// Data required to draw a frame
    type DrawData<'a>
    where
        Self: 'a;

    /// Creates pipeline layouts and the pipeline itself.
    fn new(ctx: &GpuProgramRenderContext, init_data: Self::InitData<'_>) -> Self;

    /// Encodes commands into the RenderPass.
    fn record<'a>(&'a self, rpass: &mut wgpu::RenderPass<'a>, data: Self::DrawData<'a>);
}

/// Everything a generated program is specialized on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramKey {
    pub config: ClusterConfig,
    pub mode: ShadingMode,
    pub specular: SpecularAccumulation,
}

impl ProgramKey {
    pub fn new(config: ClusterConfig, mode: ShadingMode) -> Self {
        Self {
            config,
            mode,
            specular: SpecularAccumulation::default(),
        }
    }

    pub fn with_specular(mut self, specular: SpecularAccumulation) -> Self {
        self.specular = specular;
        self
    }

    pub fn label(&self) -> String {
        let c = &self.config;
        format!(
            "{} {}x{}x{} L{} M{}",
            self.mode.label(),
            c.x_slices,
            c.y_slices,
            c.z_slices,
            c.num_lights,
            c.max_lights
        )
    }
}

/// WGSL float literal, always with a decimal point.
fn float_literal(value: f32) -> String {
    format!("{value:?}")
}

/// Instantiates the WGSL program for `key`: the shared prelude followed by
/// the entry points of its mode, with every `{{NAME}}` substituted.
pub fn generate_wgsl(key: &ProgramKey) -> String {
    let config = &key.config;
    let body = match key.mode {
        ShadingMode::Deferred => DEFERRED,
        ShadingMode::ForwardPlus => FORWARD_PLUS,
    };
    let specular = match key.specular {
        SpecularAccumulation::IntoAlbedo => "albedo += vec3<f32>(spec);",
        SpecularAccumulation::Separate => "highlights += light.color * spec * intensity;",
    };
    let ambient = AMBIENT_LIGHT
        .to_array()
        .map(float_literal)
        .join(", ");

    let substitutions = [
        ("NUM_LIGHTS", config.num_lights.to_string()),
        ("X_SLICES", config.x_slices.to_string()),
        ("Y_SLICES", config.y_slices.to_string()),
        ("Z_SLICES", config.z_slices.to_string()),
        ("CLUSTER_COUNT", config.cluster_count().to_string()),
        ("CLUSTER_TEXTURE_HEIGHT", config.cluster_texture_height().to_string()),
        ("LIGHT_TEXTURE_HEIGHT", LIGHT_TEXTURE_HEIGHT.to_string()),
        ("AMBIENT_LIGHT", ambient),
        ("SPECULAR_EXPONENT", float_literal(SPECULAR_EXPONENT)),
        ("SPECULAR_ACCUMULATE", specular.to_string()),
    ];

    let mut source = format!("{PRELUDE}\n{body}");
    for (name, value) in substitutions {
        source = source.replace(&format!("{{{{{name}}}}}"), &value);
    }
    source
}

/// Generated sources and compiled modules, memoized per [`ProgramKey`].
#[derive(Default)]
pub struct ProgramCache {
    sources: HashMap<ProgramKey, Arc<str>>,
    modules: HashMap<ProgramKey, wgpu::ShaderModule>,
}

impl ProgramCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&mut self, key: &ProgramKey) -> Arc<str> {
        if let Some(source) = self.sources.get(key) {
            log::debug!("Program source cache hit: {}", key.label());
            return source.clone();
        }
        log::debug!("Generating program source: {}", key.label());
        let source: Arc<str> = generate_wgsl(key).into();
        self.sources.insert(*key, source.clone());
        source
    }

    /// Compiles `key` on first use.
    pub fn module(&mut self, device: &wgpu::Device, key: &ProgramKey) -> wgpu::ShaderModule {
        if let Some(module) = self.modules.get(key) {
            log::debug!("Shader module cache hit: {}", key.label());
            return module.clone();
        }
        let source = self.source(key);
        let label = key.label();
        log::info!("Compiling shader module: {label}");
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&label),
            source: wgpu::ShaderSource::Wgsl(source.as_ref().into()),
        });
        self.modules.insert(*key, module.clone());
        module
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }
}
