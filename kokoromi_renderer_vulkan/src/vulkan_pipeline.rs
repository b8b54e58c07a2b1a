/// Pipeline - descriptor layouts, descriptor pool, shaders, render pass and the mesh pipeline

use kokoromi_engine::kokoromi::{Error, Result};
use kokoromi_engine::kokoromi::render::{PushConstants, RendererConfig};
use kokoromi_engine::kokoromi::scene::Vertex;
use kokoromi_engine::{engine_debug, engine_error, engine_err};
use ash::vk;
use std::path::Path;
use std::sync::Arc;

use crate::vulkan_context::DeviceContext;

/// Set capacity of the descriptor pool, also used per descriptor type
pub const MAX_DESCRIPTOR_SETS: u32 = 1000;

// ===== DESCRIPTOR LAYOUTS =====

/// Set layouts of the mesh pipeline
///
/// Set 0 binds the per-frame uniform block (dynamic offset, vertex and
/// fragment stages) and the material texture. Set 1 holds a single sampler
/// binding that the mesh shaders do not read.
pub struct DescriptorLayouts {
    ctx: Arc<DeviceContext>,
    pub(crate) material: vk::DescriptorSetLayout,
    pub(crate) auxiliary: vk::DescriptorSetLayout,
}

impl DescriptorLayouts {
    pub fn new(ctx: Arc<DeviceContext>) -> Result<Self> {
        let material_bindings = [
            vk::DescriptorSetLayoutBinding::default()
                .binding(0)
                .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT),
            vk::DescriptorSetLayoutBinding::default()
                .binding(1)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::FRAGMENT),
        ];
        let auxiliary_bindings = [vk::DescriptorSetLayoutBinding::default()
            .binding(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::FRAGMENT)];

        unsafe {
            let material = ctx
                .device
                .create_descriptor_set_layout(
                    &vk::DescriptorSetLayoutCreateInfo::default().bindings(&material_bindings),
                    None,
                )
                .map_err(|e| {
                    engine_error!("kokoromi::vulkan", "Failed to create descriptor set layout: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create descriptor set layout: {:?}", e))
                })?;

            let auxiliary = match ctx.device.create_descriptor_set_layout(
                &vk::DescriptorSetLayoutCreateInfo::default().bindings(&auxiliary_bindings),
                None,
            ) {
                Ok(layout) => layout,
                Err(e) => {
                    ctx.device.destroy_descriptor_set_layout(material, None);
                    engine_error!("kokoromi::vulkan", "Failed to create descriptor set layout: {:?}", e);
                    return Err(Error::InitializationFailed(format!(
                        "Failed to create descriptor set layout: {:?}",
                        e
                    )));
                }
            };

            Ok(Self { ctx, material, auxiliary })
        }
    }
}

impl Drop for DescriptorLayouts {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_descriptor_set_layout(self.auxiliary, None);
            self.ctx.device.destroy_descriptor_set_layout(self.material, None);
        }
    }
}

// ===== DESCRIPTOR POOL =====

/// Fixed-capacity pool; sets are released together with the pool
pub struct DescriptorPool {
    ctx: Arc<DeviceContext>,
    pub(crate) pool: vk::DescriptorPool,
}

impl DescriptorPool {
    pub fn new(ctx: Arc<DeviceContext>) -> Result<Self> {
        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
                descriptor_count: MAX_DESCRIPTOR_SETS,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: MAX_DESCRIPTOR_SETS,
            },
        ];
        let pool_info = vk::DescriptorPoolCreateInfo::default()
            .pool_sizes(&pool_sizes)
            .max_sets(MAX_DESCRIPTOR_SETS);

        let pool = unsafe {
            ctx.device.create_descriptor_pool(&pool_info, None).map_err(|e| {
                engine_error!("kokoromi::vulkan", "Failed to create descriptor pool: {:?}", e);
                Error::InitializationFailed(format!("Failed to create descriptor pool: {:?}", e))
            })?
        };

        Ok(Self { ctx, pool })
    }

    /// Allocate a material set and point it at `uniform_range` bytes of
    /// `uniform_buffer` and at `texture`
    pub fn allocate_material_set(
        &self,
        layout: vk::DescriptorSetLayout,
        uniform_buffer: vk::Buffer,
        uniform_range: u64,
        view: vk::ImageView,
        sampler: vk::Sampler,
    ) -> Result<vk::DescriptorSet> {
        let layouts = [layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(&layouts);

        unsafe {
            let set = self
                .ctx
                .device
                .allocate_descriptor_sets(&alloc_info)
                .map_err(|e| match e {
                    vk::Result::ERROR_OUT_OF_POOL_MEMORY | vk::Result::ERROR_FRAGMENTED_POOL => {
                        engine_error!("kokoromi::vulkan", "Descriptor pool exhausted ({} sets)", MAX_DESCRIPTOR_SETS);
                        Error::OutOfMemory
                    }
                    e => engine_err!("kokoromi::vulkan", "Failed to allocate descriptor set: {:?}", e),
                })?[0];

            let buffer_info = [vk::DescriptorBufferInfo {
                buffer: uniform_buffer,
                offset: 0,
                range: uniform_range,
            }];
            let image_info = [vk::DescriptorImageInfo {
                sampler,
                image_view: view,
                image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            }];
            let writes = [
                vk::WriteDescriptorSet::default()
                    .dst_set(set)
                    .dst_binding(0)
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC)
                    .buffer_info(&buffer_info),
                vk::WriteDescriptorSet::default()
                    .dst_set(set)
                    .dst_binding(1)
                    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .image_info(&image_info),
            ];
            self.ctx.device.update_descriptor_sets(&writes, &[]);

            Ok(set)
        }
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

// ===== SHADERS =====

/// SPIR-V words of the mesh shaders, read once at startup
pub struct ShaderBlobs {
    pub vertex: Vec<u32>,
    pub fragment: Vec<u32>,
}

impl ShaderBlobs {
    pub fn load(config: &RendererConfig) -> Result<Self> {
        Ok(Self {
            vertex: read_spirv(&config.vertex_shader_path)?,
            fragment: read_spirv(&config.fragment_shader_path)?,
        })
    }
}

fn read_spirv(path: &Path) -> Result<Vec<u32>> {
    let mut file = std::fs::File::open(path).map_err(|e| {
        engine_error!("kokoromi::vulkan", "Failed to open shader {}: {}", path.display(), e);
        Error::AssetLoad(format!("{}: {}", path.display(), e))
    })?;
    let words = ash::util::read_spv(&mut file).map_err(|e| {
        engine_error!("kokoromi::vulkan", "Invalid SPIR-V in {}: {}", path.display(), e);
        Error::AssetLoad(format!("{}: {}", path.display(), e))
    })?;
    engine_debug!("kokoromi::vulkan", "Loaded shader {} ({} words)", path.display(), words.len());
    Ok(words)
}

/// Shader module that lives only while a pipeline is being built
struct ShaderModule<'a> {
    device: &'a ash::Device,
    module: vk::ShaderModule,
}

impl<'a> ShaderModule<'a> {
    fn new(device: &'a ash::Device, code: &[u32]) -> Result<Self> {
        let create_info = vk::ShaderModuleCreateInfo::default().code(code);
        let module = unsafe {
            device
                .create_shader_module(&create_info, None)
                .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to create shader module: {:?}", e))?
        };
        Ok(Self { device, module })
    }
}

impl Drop for ShaderModule<'_> {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

// ===== VERTEX INPUT =====

/// Binding 0, per-vertex, stride of one `Vertex`
pub fn vertex_binding() -> vk::VertexInputBindingDescription {
    vk::VertexInputBindingDescription {
        binding: 0,
        stride: std::mem::size_of::<Vertex>() as u32,
        input_rate: vk::VertexInputRate::VERTEX,
    }
}

/// position (0), color (1), uv (2), normal (3)
pub fn vertex_attributes() -> [vk::VertexInputAttributeDescription; 4] {
    [
        vk::VertexInputAttributeDescription {
            location: 0,
            binding: 0,
            format: vk::Format::R32G32B32_SFLOAT,
            offset: std::mem::offset_of!(Vertex, position) as u32,
        },
        vk::VertexInputAttributeDescription {
            location: 1,
            binding: 0,
            format: vk::Format::R32G32B32_SFLOAT,
            offset: std::mem::offset_of!(Vertex, color) as u32,
        },
        vk::VertexInputAttributeDescription {
            location: 2,
            binding: 0,
            format: vk::Format::R32G32_SFLOAT,
            offset: std::mem::offset_of!(Vertex, uv) as u32,
        },
        vk::VertexInputAttributeDescription {
            location: 3,
            binding: 0,
            format: vk::Format::R32G32B32_SFLOAT,
            offset: std::mem::offset_of!(Vertex, normal) as u32,
        },
    ]
}

// ===== RENDER PIPELINE =====

/// Render pass, pipeline layout and mesh pipeline for one swapchain generation
pub struct RenderPipeline {
    ctx: Arc<DeviceContext>,
    pub(crate) render_pass: vk::RenderPass,
    pub(crate) layout: vk::PipelineLayout,
    pub(crate) pipeline: vk::Pipeline,
}

impl RenderPipeline {
    pub fn new(
        ctx: Arc<DeviceContext>,
        shaders: &ShaderBlobs,
        layouts: &DescriptorLayouts,
        color_format: vk::Format,
        depth_format: vk::Format,
        extent: vk::Extent2D,
    ) -> Result<Self> {
        // Filled in step by step; `Drop` skips null handles
        let mut pipeline = Self {
            ctx,
            render_pass: vk::RenderPass::null(),
            layout: vk::PipelineLayout::null(),
            pipeline: vk::Pipeline::null(),
        };

        pipeline.render_pass = create_render_pass(&pipeline.ctx.device, color_format, depth_format)?;

        let set_layouts = [layouts.material, layouts.auxiliary];
        let push_constant_ranges = [vk::PushConstantRange {
            stage_flags: vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
            offset: 0,
            size: std::mem::size_of::<PushConstants>() as u32,
        }];
        let layout_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&set_layouts)
            .push_constant_ranges(&push_constant_ranges);
        pipeline.layout = unsafe {
            pipeline
                .ctx
                .device
                .create_pipeline_layout(&layout_info, None)
                .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to create pipeline layout: {:?}", e))?
        };

        pipeline.pipeline = create_mesh_pipeline(
            &pipeline.ctx.device,
            shaders,
            pipeline.layout,
            pipeline.render_pass,
            extent,
        )?;

        Ok(pipeline)
    }
}

impl Drop for RenderPipeline {
    fn drop(&mut self) {
        unsafe {
            if self.pipeline != vk::Pipeline::null() {
                self.ctx.device.destroy_pipeline(self.pipeline, None);
            }
            if self.layout != vk::PipelineLayout::null() {
                self.ctx.device.destroy_pipeline_layout(self.layout, None);
            }
            if self.render_pass != vk::RenderPass::null() {
                self.ctx.device.destroy_render_pass(self.render_pass, None);
            }
        }
    }
}

/// Color (cleared, presented) + depth (cleared, discarded), one subpass
fn create_render_pass(device: &ash::Device, color_format: vk::Format, depth_format: vk::Format) -> Result<vk::RenderPass> {
    let attachments = [
        vk::AttachmentDescription::default()
            .format(color_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR),
        vk::AttachmentDescription::default()
            .format(depth_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::DONT_CARE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
    ];

    let color_refs = [vk::AttachmentReference {
        attachment: 0,
        layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    }];
    let depth_ref = vk::AttachmentReference {
        attachment: 1,
        layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
    };
    let subpasses = [vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_refs)
        .depth_stencil_attachment(&depth_ref)];

    let dependencies = [external_dependency()];

    let render_pass_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(&subpasses)
        .dependencies(&dependencies);

    unsafe {
        device
            .create_render_pass(&render_pass_info, None)
            .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to create render pass: {:?}", e))
    }
}

/// Dependency on work before the render pass, including the previous frame's use
/// of the shared depth image: its depth writes finish before this pass clears it
pub(crate) fn external_dependency() -> vk::SubpassDependency {
    vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
        )
        .src_access_mask(vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE)
        .dst_stage_mask(
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
        )
        .dst_access_mask(
            vk::AccessFlags::COLOR_ATTACHMENT_READ
                | vk::AccessFlags::COLOR_ATTACHMENT_WRITE
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        )
}

/// Triangle list, back-face culling (CCW front), depth LESS with writes, no blending,
/// viewport and scissor fixed to `extent`
fn create_mesh_pipeline(
    device: &ash::Device,
    shaders: &ShaderBlobs,
    layout: vk::PipelineLayout,
    render_pass: vk::RenderPass,
    extent: vk::Extent2D,
) -> Result<vk::Pipeline> {
    let vertex_module = ShaderModule::new(device, &shaders.vertex)?;
    let fragment_module = ShaderModule::new(device, &shaders.fragment)?;

    let stages = [
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::VERTEX)
            .module(vertex_module.module)
            .name(c"main"),
        vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::FRAGMENT)
            .module(fragment_module.module)
            .name(c"main"),
    ];

    let bindings = [vertex_binding()];
    let attributes = vertex_attributes();
    let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
        .vertex_binding_descriptions(&bindings)
        .vertex_attribute_descriptions(&attributes);

    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
        .primitive_restart_enable(false);

    let viewports = [vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: extent.width as f32,
        height: extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }];
    let scissors = [vk::Rect2D {
        offset: vk::Offset2D { x: 0, y: 0 },
        extent,
    }];
    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewports(&viewports)
        .scissors(&scissors);

    let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
        .depth_clamp_enable(false)
        .rasterizer_discard_enable(false)
        .polygon_mode(vk::PolygonMode::FILL)
        .line_width(1.0)
        .cull_mode(vk::CullModeFlags::BACK)
        .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
        .depth_bias_enable(false);

    let multisample = vk::PipelineMultisampleStateCreateInfo::default()
        .sample_shading_enable(false)
        .rasterization_samples(vk::SampleCountFlags::TYPE_1);

    let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
        .depth_test_enable(true)
        .depth_write_enable(true)
        .depth_compare_op(vk::CompareOp::LESS)
        .depth_bounds_test_enable(false)
        .stencil_test_enable(false);

    let blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
        .color_write_mask(vk::ColorComponentFlags::RGBA)
        .blend_enable(false)];
    let color_blend = vk::PipelineColorBlendStateCreateInfo::default()
        .logic_op_enable(false)
        .attachments(&blend_attachments);

    let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&stages)
        .vertex_input_state(&vertex_input)
        .input_assembly_state(&input_assembly)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterization)
        .multisample_state(&multisample)
        .depth_stencil_state(&depth_stencil)
        .color_blend_state(&color_blend)
        .layout(layout)
        .render_pass(render_pass)
        .subpass(0);

    let pipelines = unsafe {
        device
            .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
            .map_err(|(_, e)| engine_err!("kokoromi::vulkan", "Failed to create graphics pipeline: {:?}", e))?
    };

    pipelines
        .into_iter()
        .next()
        .ok_or_else(|| engine_err!("kokoromi::vulkan", "Driver returned no graphics pipeline"))
}

#[cfg(test)]
#[path = "vulkan_pipeline_tests.rs"]
mod tests;
