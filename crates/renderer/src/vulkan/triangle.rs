//! Clear-and-draw recorder.

use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::{info, warn};

use vkframe_rhi::RhiResult;
use vkframe_rhi::command::CommandBuffer;
use vkframe_rhi::pipeline::{GraphicsPipelineBuilder, Pipeline, PipelineLayout};
use vkframe_rhi::shader::{Shader, ShaderStage};

use crate::backend::{CommandRecorder, FrameInfo, PresentationSurface};
use crate::vulkan::{SwapchainPresentation, VulkanContext};

/// Clears the swap image and draws one triangle from `gl_VertexIndex`.
///
/// Without shaders the pass still clears, so presentation can be exercised
/// on machines without a SPIR-V toolchain.
pub struct TrianglePass {
    pipeline: Option<TrianglePipeline>,
    clear_color: [f32; 4],
}

struct TrianglePipeline {
    pipeline: Pipeline,
    _layout: PipelineLayout,
    // Declared last: the device must outlive the pipeline objects.
    _context: Arc<VulkanContext>,
}

impl TrianglePass {
    /// Builds the pass against `presentation`'s render pass.
    ///
    /// A missing shader file is logged and yields a clear-only pass. Invalid
    /// SPIR-V or pipeline creation failures are errors.
    pub fn new(
        context: &Arc<VulkanContext>,
        presentation: &SwapchainPresentation,
        vertex_shader: &Path,
        fragment_shader: &Path,
        clear_color: [f32; 4],
    ) -> RhiResult<Self> {
        for path in [vertex_shader, fragment_shader] {
            if !path.is_file() {
                warn!("Shader {:?} not found, recording clear-only frames", path);
                return Ok(Self::clear_only(clear_color));
            }
        }

        let device = context.device().clone();
        let vertex = Shader::from_spirv_file(
            device.clone(),
            vertex_shader,
            ShaderStage::Vertex,
            "main",
        )?;
        let fragment = Shader::from_spirv_file(
            device.clone(),
            fragment_shader,
            ShaderStage::Fragment,
            "main",
        )?;

        let layout = PipelineLayout::new(device.clone())?;
        let pipeline = GraphicsPipelineBuilder::new()
            .vertex_shader(&vertex)
            .fragment_shader(&fragment)
            .render_pass(presentation.render_pass(), 0)
            .build(device, &layout)?;

        info!("Triangle pass ready");

        Ok(Self {
            pipeline: Some(TrianglePipeline {
                pipeline,
                _layout: layout,
                _context: Arc::clone(context),
            }),
            clear_color,
        })
    }

    pub fn clear_only(clear_color: [f32; 4]) -> Self {
        Self {
            pipeline: None,
            clear_color,
        }
    }

    #[inline]
    pub fn draws_geometry(&self) -> bool {
        self.pipeline.is_some()
    }

    #[inline]
    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }
}

impl CommandRecorder<VulkanContext, SwapchainPresentation> for TrianglePass {
    fn record(
        &mut self,
        _context: &VulkanContext,
        command_buffer: &CommandBuffer,
        frame: FrameInfo,
        surface: &SwapchainPresentation,
    ) -> RhiResult<()> {
        let framebuffer = surface.framebuffer(frame.image_index).ok_or_else(|| {
            vkframe_rhi::RhiError::SwapchainError(format!(
                "no framebuffer for image {}",
                frame.image_index
            ))
        })?;
        let extent: vk::Extent2D = surface.extent().into();

        command_buffer.begin()?;

        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue {
                float32: self.clear_color,
            },
        }];
        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(surface.render_pass().handle())
            .framebuffer(framebuffer.handle())
            .render_area(render_area)
            .clear_values(&clear_values);

        command_buffer.begin_render_pass(&begin_info);

        if let Some(TrianglePipeline { pipeline, .. }) = &self.pipeline {
            let viewport = vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            };
            command_buffer.set_viewport(&viewport);
            command_buffer.set_scissor(&render_area);
            command_buffer.bind_pipeline(pipeline.bind_point(), pipeline.handle());
            command_buffer.draw(3, 1, 0, 0);
        }

        command_buffer.end_render_pass();
        command_buffer.end()?;

        Ok(())
    }
}
