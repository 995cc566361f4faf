//! SPIR-V shader modules.
//!
//! Shaders are loaded precompiled; compiling GLSL is left to external tools.

use std::ffi::{CStr, CString};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Programmable stage a module is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn to_vk_stage(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Shader module with its stage and entry point.
pub struct Shader {
    device: Arc<Device>,
    module: vk::ShaderModule,
    stage: ShaderStage,
    entry_point: CString,
}

impl Shader {
    /// Loads a SPIR-V binary from disk.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device that owns the module
    /// * `path` - Compiled `.spv` file
    /// * `stage` - Stage the module will be bound to
    /// * `entry_point` - Name of the entry function, usually `main`
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::ShaderError`] if the file cannot be read or is not
    /// valid SPIR-V, or a Vulkan error if module creation fails.
    pub fn from_spirv_file(
        device: Arc<Device>,
        path: &Path,
        stage: ShaderStage,
        entry_point: &str,
    ) -> RhiResult<Self> {
        debug!("Loading {} shader from {:?}", stage, path);

        let bytes = std::fs::read(path).map_err(|e| {
            RhiError::ShaderError(format!("Failed to read shader file {:?}: {}", path, e))
        })?;

        Self::from_spirv_bytes(device, &bytes, stage, entry_point)
    }

    /// Creates a module from SPIR-V bytes.
    ///
    /// The length must be a non-zero multiple of four. A byte-swapped binary
    /// is converted to native order.
    pub fn from_spirv_bytes(
        device: Arc<Device>,
        bytes: &[u8],
        stage: ShaderStage,
        entry_point: &str,
    ) -> RhiResult<Self> {
        let code = spirv_words(bytes)?;

        let entry_point_cstring = CString::new(entry_point)
            .map_err(|e| RhiError::ShaderError(format!("Invalid entry point name: {}", e)))?;

        let create_info = vk::ShaderModuleCreateInfo::default().code(&code);

        let module = unsafe { device.handle().create_shader_module(&create_info, None)? };

        info!(
            "Created {} shader module with entry point '{}'",
            stage, entry_point
        );

        Ok(Self {
            device,
            module,
            stage,
            entry_point: entry_point_cstring,
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    #[inline]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    #[inline]
    pub fn entry_point(&self) -> &CStr {
        &self.entry_point
    }

    pub fn stage_create_info(&self) -> vk::PipelineShaderStageCreateInfo<'_> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(self.stage.to_vk_stage())
            .module(self.module)
            .name(&self.entry_point)
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_shader_module(self.module, None);
        }
        debug!("Destroyed {} shader module", self.stage);
    }
}

/// Decodes SPIR-V bytes into words, checking length and magic number.
fn spirv_words(bytes: &[u8]) -> RhiResult<Vec<u32>> {
    if bytes.is_empty() {
        return Err(RhiError::ShaderError("SPIR-V code is empty".to_string()));
    }

    ash::util::read_spv(&mut Cursor::new(bytes))
        .map_err(|e| RhiError::ShaderError(format!("Invalid SPIR-V: {}", e)))
}
