//! Graphics pipeline creation.
//!
//! [`GraphicsPipelineBuilder`] collects the fixed-function state and builds a
//! [`Pipeline`] against a render pass. Viewport and scissor are always
//! dynamic, so a pipeline survives swapchain recreation unchanged.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vkframe_rhi::device::Device;
//! use vkframe_rhi::pipeline::{FrontFace, GraphicsPipelineBuilder, PipelineLayout};
//! use vkframe_rhi::render_pass::RenderPass;
//! use vkframe_rhi::shader::Shader;
//!
//! # fn example(
//! #     device: Arc<Device>,
//! #     vert: &Shader,
//! #     frag: &Shader,
//! #     render_pass: &RenderPass,
//! # ) -> Result<(), vkframe_rhi::RhiError> {
//! let layout = PipelineLayout::new(device.clone())?;
//! let pipeline = GraphicsPipelineBuilder::new()
//!     .vertex_shader(vert)
//!     .fragment_shader(frag)
//!     .front_face(FrontFace::Clockwise)
//!     .render_pass(render_pass, 0)
//!     .build(device, &layout)?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::render_pass::RenderPass;
use crate::shader::Shader;

/// Pipeline layout wrapper.
pub struct PipelineLayout {
    device: Arc<Device>,
    layout: vk::PipelineLayout,
}

impl PipelineLayout {
    /// Creates a layout with no descriptor sets or push constants.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let create_info = vk::PipelineLayoutCreateInfo::default();

        let layout = unsafe { device.handle().create_pipeline_layout(&create_info, None)? };

        debug!("Created empty pipeline layout");

        Ok(Self { device, layout })
    }

    #[inline]
    pub fn handle(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_pipeline_layout(self.layout, None);
        }
        debug!("Pipeline layout destroyed");
    }
}

/// Graphics pipeline wrapper.
pub struct Pipeline {
    device: Arc<Device>,
    pipeline: vk::Pipeline,
}

impl Pipeline {
    #[inline]
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    #[inline]
    pub fn bind_point(&self) -> vk::PipelineBindPoint {
        vk::PipelineBindPoint::GRAPHICS
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_pipeline(self.pipeline, None);
        }
        info!("Graphics pipeline destroyed");
    }
}

/// Primitive topology.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PrimitiveTopology {
    LineList,
    #[default]
    TriangleList,
    TriangleStrip,
}

impl PrimitiveTopology {
    pub fn to_vk(self) -> vk::PrimitiveTopology {
        match self {
            PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
            PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
            PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
        }
    }
}

/// Face culling mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    #[default]
    Back,
}

impl CullMode {
    pub fn to_vk(self) -> vk::CullModeFlags {
        match self {
            CullMode::None => vk::CullModeFlags::NONE,
            CullMode::Front => vk::CullModeFlags::FRONT,
            CullMode::Back => vk::CullModeFlags::BACK,
        }
    }
}

/// Winding order of front-facing triangles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrontFace {
    CounterClockwise,
    #[default]
    Clockwise,
}

impl FrontFace {
    pub fn to_vk(self) -> vk::FrontFace {
        match self {
            FrontFace::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
            FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
        }
    }
}

/// Builder for graphics pipelines without vertex input.
pub struct GraphicsPipelineBuilder<'a> {
    vertex_shader: Option<&'a Shader>,
    fragment_shader: Option<&'a Shader>,
    topology: PrimitiveTopology,
    cull_mode: CullMode,
    front_face: FrontFace,
    render_pass: Option<(&'a RenderPass, u32)>,
    dynamic_states: Vec<vk::DynamicState>,
}

impl Default for GraphicsPipelineBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> GraphicsPipelineBuilder<'a> {
    pub fn new() -> Self {
        Self {
            vertex_shader: None,
            fragment_shader: None,
            topology: PrimitiveTopology::TriangleList,
            cull_mode: CullMode::Back,
            front_face: FrontFace::Clockwise,
            render_pass: None,
            dynamic_states: vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR],
        }
    }

    pub fn vertex_shader(mut self, shader: &'a Shader) -> Self {
        self.vertex_shader = Some(shader);
        self
    }

    pub fn fragment_shader(mut self, shader: &'a Shader) -> Self {
        self.fragment_shader = Some(shader);
        self
    }

    pub fn topology(mut self, topology: PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    pub fn cull_mode(mut self, mode: CullMode) -> Self {
        self.cull_mode = mode;
        self
    }

    pub fn front_face(mut self, face: FrontFace) -> Self {
        self.front_face = face;
        self
    }

    /// Render pass and subpass index the pipeline is used in.
    pub fn render_pass(mut self, render_pass: &'a RenderPass, subpass: u32) -> Self {
        self.render_pass = Some((render_pass, subpass));
        self
    }

    /// Adds a dynamic state on top of viewport and scissor.
    pub fn dynamic_state(mut self, state: vk::DynamicState) -> Self {
        if !self.dynamic_states.contains(&state) {
            self.dynamic_states.push(state);
        }
        self
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::PipelineError`] if a shader or the render pass is
    /// missing, or a Vulkan error if creation fails.
    pub fn build(self, device: Arc<Device>, layout: &PipelineLayout) -> RhiResult<Pipeline> {
        let vertex_shader = self
            .vertex_shader
            .ok_or_else(|| RhiError::PipelineError("Vertex shader is required".to_string()))?;

        let fragment_shader = self
            .fragment_shader
            .ok_or_else(|| RhiError::PipelineError("Fragment shader is required".to_string()))?;

        let (render_pass, subpass) = self
            .render_pass
            .ok_or_else(|| RhiError::PipelineError("Render pass is required".to_string()))?;

        let shader_stages = [
            vertex_shader.stage_create_info(),
            fragment_shader.stage_create_info(),
        ];

        // Vertices come from gl_VertexIndex
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default();

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(self.topology.to_vk())
            .primitive_restart_enable(false);

        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(self.cull_mode.to_vk())
            .front_face(self.front_face.to_vk());

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1)
            .min_sample_shading(1.0);

        let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
            .blend_enable(false)
            .color_write_mask(vk::ColorComponentFlags::RGBA)];

        let color_blend_state =
            vk::PipelineColorBlendStateCreateInfo::default().attachments(&color_blend_attachments);

        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&self.dynamic_states);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(layout.handle())
            .render_pass(render_pass.handle())
            .subpass(subpass);

        let pipelines = unsafe {
            device
                .handle()
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
                .map_err(|(_, result)| result)?
        };

        let pipeline = pipelines
            .into_iter()
            .next()
            .ok_or_else(|| RhiError::PipelineError("Driver returned no pipeline".to_string()))?;

        info!("Graphics pipeline created");

        Ok(Pipeline { device, pipeline })
    }
}
