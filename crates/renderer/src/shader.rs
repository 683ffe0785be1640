//! Shader programs: WGSL validated with naga, vertex inputs reflected by name.
//!
//! Every program declares `vs_main`/`fs_main` and binds the shared scene
//! layouts. Vertex inputs are matched by name: `a_position` is required,
//! `a_normal` and `a_uv` are optional.

use std::sync::Arc;

use naga::valid::{Capabilities, ValidationFlags, Validator};
use wgpu::{
    BlendState, ColorTargetState, ColorWrites, DepthBiasState, DepthStencilState, FragmentState,
    RenderPipeline, RenderPipelineDescriptor, ShaderModuleDescriptor, ShaderSource,
    VertexAttribute, VertexBufferLayout, VertexFormat, VertexState, VertexStepMode,
};

use crate::context::GpuContext;
use crate::error::{RenderError, RenderResult};
use crate::layouts::DEPTH_FORMAT;

const VERTEX_ENTRY: &str = "vs_main";
const FRAGMENT_ENTRY: &str = "fs_main";

pub const POSITION_INPUT: &str = "a_position";
pub const NORMAL_INPUT: &str = "a_normal";
pub const UV_INPUT: &str = "a_uv";

/// Per-vertex attribute streams a mesh can supply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexInput {
    Position,
    Normal,
    Uv,
}

impl VertexInput {
    pub fn format(self) -> VertexFormat {
        match self {
            VertexInput::Position | VertexInput::Normal => VertexFormat::Float32x3,
            VertexInput::Uv => VertexFormat::Float32x2,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Shader locations of the inputs a program consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeSlots {
    pub position: u32,
    pub normal: Option<u32>,
    pub uv: Option<u32>,
}

impl AttributeSlots {
    /// Consumed inputs with their locations, in vertex-buffer slot order.
    pub fn inputs(&self) -> Vec<(VertexInput, u32)> {
        let mut inputs = vec![(VertexInput::Position, self.position)];
        inputs.extend(self.normal.map(|l| (VertexInput::Normal, l)));
        inputs.extend(self.uv.map(|l| (VertexInput::Uv, l)));
        inputs
    }

    pub fn consumes(&self, input: VertexInput) -> bool {
        match input {
            VertexInput::Position => true,
            VertexInput::Normal => self.normal.is_some(),
            VertexInput::Uv => self.uv.is_some(),
        }
    }
}

/// Parse and validate `source`, then reflect the inputs of `vs_main`.
pub fn reflect_attributes(label: &str, source: &str) -> RenderResult<AttributeSlots> {
    let module = validate(label, source)?;
    reflect_module(label, &module)
}

fn validate(label: &str, source: &str) -> RenderResult<naga::Module> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| RenderError::Shader {
        label: label.to_string(),
        message: e.emit_to_string(source),
    })?;
    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| RenderError::Shader {
            label: label.to_string(),
            message: e.to_string(),
        })?;
    Ok(module)
}

fn reflect_module(label: &str, module: &naga::Module) -> RenderResult<AttributeSlots> {
    let shader_error = |message: String| RenderError::Shader {
        label: label.to_string(),
        message,
    };
    let vertex = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == naga::ShaderStage::Vertex && ep.name == VERTEX_ENTRY)
        .ok_or_else(|| shader_error(format!("no vertex entry point '{VERTEX_ENTRY}'")))?;
    if !module
        .entry_points
        .iter()
        .any(|ep| ep.stage == naga::ShaderStage::Fragment && ep.name == FRAGMENT_ENTRY)
    {
        return Err(shader_error(format!(
            "no fragment entry point '{FRAGMENT_ENTRY}'"
        )));
    }

    // Inputs are either bare arguments or members of a struct argument.
    let mut locations: Vec<(&str, u32)> = Vec::new();
    for arg in &vertex.function.arguments {
        match (&arg.binding, &module.types[arg.ty].inner) {
            (Some(naga::Binding::Location { location, .. }), _) => {
                if let Some(name) = &arg.name {
                    locations.push((name.as_str(), *location));
                }
            }
            (None, naga::TypeInner::Struct { members, .. }) => {
                for member in members {
                    if let (Some(name), Some(naga::Binding::Location { location, .. })) =
                        (&member.name, &member.binding)
                    {
                        locations.push((name.as_str(), *location));
                    }
                }
            }
            _ => {}
        }
    }
    let find = |wanted: &str| {
        locations
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, location)| *location)
    };

    Ok(AttributeSlots {
        position: find(POSITION_INPUT).ok_or_else(|| RenderError::MissingAttribute {
            label: label.to_string(),
            attribute: POSITION_INPUT,
        })?,
        normal: find(NORMAL_INPUT),
        uv: find(UV_INPUT),
    })
}

/// A compiled program: pipeline plus the attribute slots it reads.
pub struct ShaderProgram {
    label: String,
    pipeline: RenderPipeline,
    attributes: AttributeSlots,
}

impl ShaderProgram {
    /// Compile WGSL into a pipeline over the shared scene layouts.
    /// Fails on parse/validation errors or a missing `a_position` input.
    pub fn compile(gpu: &GpuContext, label: &str, source: &str) -> RenderResult<Arc<Self>> {
        let attributes = reflect_attributes(label, source)?;

        let module = gpu.guarded(&format!("shader module '{label}'"), |device| {
            device.create_shader_module(ShaderModuleDescriptor {
                label: Some(label),
                source: ShaderSource::Wgsl(source.into()),
            })
        })?;

        // One buffer per consumed input, in slot order.
        let inputs = attributes.inputs();
        let attribute_descs: Vec<[VertexAttribute; 1]> = inputs
            .iter()
            .map(|(input, location)| {
                [VertexAttribute {
                    format: input.format(),
                    offset: 0,
                    shader_location: *location,
                }]
            })
            .collect();
        let buffers: Vec<VertexBufferLayout> = inputs
            .iter()
            .zip(&attribute_descs)
            .map(|((input, _), attrs)| VertexBufferLayout {
                array_stride: input.format().size(),
                step_mode: VertexStepMode::Vertex,
                attributes: attrs,
            })
            .collect();

        let pipeline = gpu.guarded(&format!("pipeline '{label}'"), |device| {
            device.create_render_pipeline(&RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&gpu.layouts.pipeline),
                vertex: VertexState {
                    module: &module,
                    entry_point: Some(VERTEX_ENTRY),
                    buffers: &buffers,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(FragmentState {
                    module: &module,
                    entry_point: Some(FRAGMENT_ENTRY),
                    targets: &[Some(ColorTargetState {
                        format: gpu.color_format,
                        blend: Some(BlendState::ALPHA_BLENDING),
                        write_mask: ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    cull_mode: Some(wgpu::Face::Back),
                    ..Default::default()
                },
                depth_stencil: Some(DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                    stencil: wgpu::StencilState::default(),
                    bias: DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })?;

        log::info!("compiled shader '{label}' with inputs {:?}", attributes);
        Ok(Arc::new(Self {
            label: label.to_string(),
            pipeline,
            attributes,
        }))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    pub fn attributes(&self) -> AttributeSlots {
        self.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRELUDE: &str = include_str!("shaders/common.wgsl");

    fn with_prelude(body: &str) -> String {
        format!("{PRELUDE}\n{body}")
    }

    #[test]
    fn builtin_programs_validate() {
        let lit = reflect_attributes("lit", &with_prelude(include_str!("shaders/lit.wgsl")))
            .expect("lit");
        assert_eq!(lit.normal, Some(1));
        assert_eq!(lit.uv, None);

        let textured = reflect_attributes(
            "textured",
            &with_prelude(include_str!("shaders/textured.wgsl")),
        )
        .expect("textured");
        assert_eq!(textured.position, 0);
        assert_eq!(textured.normal, Some(1));
        assert_eq!(textured.uv, Some(2));
    }

    #[test]
    fn reflects_bare_arguments() {
        let src = r#"
@vertex
fn vs_main(@location(3) a_uv: vec2<f32>, @location(5) a_position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(a_position + vec3<f32>(a_uv, 0.0), 1.0);
}
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0);
}
"#;
        let slots = reflect_attributes("bare", src).expect("valid");
        assert_eq!(slots.position, 5);
        assert_eq!(slots.uv, Some(3));
        assert_eq!(slots.normal, None);
        assert_eq!(
            slots.inputs(),
            vec![(VertexInput::Position, 5), (VertexInput::Uv, 3)]
        );
        assert!(!slots.consumes(VertexInput::Normal));
    }

    #[test]
    fn missing_position_is_rejected() {
        let src = r#"
@vertex
fn vs_main(@location(0) pos: vec3<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(pos, 1.0);
}
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0);
}
"#;
        let err = reflect_attributes("unnamed", src).unwrap_err();
        assert!(matches!(
            err,
            RenderError::MissingAttribute { attribute: "a_position", .. }
        ));
    }

    #[test]
    fn syntax_errors_are_reported() {
        let err = reflect_attributes("broken", "fn vs_main( {").unwrap_err();
        match err {
            RenderError::Shader { label, message } => {
                assert_eq!(label, "broken");
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_fragment_entry_is_rejected() {
        let src = r#"
@vertex
fn vs_main(@location(0) a_position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(a_position, 1.0);
}
"#;
        assert!(matches!(
            reflect_attributes("vertex-only", src),
            Err(RenderError::Shader { .. })
        ));
    }
}
