/// Selection rules - pure decisions over queried Vulkan properties.
///
/// Nothing here calls into the driver, so every rule is unit-testable with
/// hand-built `ash::vk` structs.

use ash::vk;
use kokoromi_engine::kokoromi::scene::mip_level_count;

// ===== QUEUE FAMILIES =====

/// Queue family indices of one physical device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }

    /// Distinct family indices (one queue is created per entry)
    pub fn unique(&self) -> Vec<u32> {
        let mut families = Vec::with_capacity(2);
        for family in [self.graphics, self.present].into_iter().flatten() {
            if !families.contains(&family) {
                families.push(family);
            }
        }
        families
    }
}

/// Record the first graphics family and, independently, the first family that
/// can present to the surface
///
/// `can_present` is queried per family index. The scan stops once both roles
/// are resolved; one family may fill both.
pub fn find_queue_families(
    families: &[vk::QueueFamilyProperties],
    mut can_present: impl FnMut(u32) -> bool,
) -> QueueFamilyIndices {
    let mut indices = QueueFamilyIndices::default();

    for (index, family) in families.iter().enumerate() {
        let index = index as u32;
        if family.queue_count == 0 {
            continue;
        }
        if indices.graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
            indices.graphics = Some(index);
        }
        if indices.present.is_none() && can_present(index) {
            indices.present = Some(index);
        }
        if indices.is_complete() {
            break;
        }
    }

    indices
}

// ===== PHYSICAL DEVICE =====

/// What device selection needs to know about one physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCandidate {
    pub device_type: vk::PhysicalDeviceType,
    pub queues_complete: bool,
    pub swapchain_supported: bool,
    /// At least one surface format and one present mode
    pub surface_adequate: bool,
    pub sampler_anisotropy: bool,
}

impl DeviceCandidate {
    pub fn is_suitable(&self) -> bool {
        self.queues_complete && self.swapchain_supported && self.surface_adequate && self.sampler_anisotropy
    }
}

/// Score a device; 0 means unusable
///
/// Integrated GPUs are preferred over discrete ones for this workload.
pub fn score_device(candidate: &DeviceCandidate) -> u32 {
    if !candidate.is_suitable() {
        return 0;
    }

    let mut score = 1;
    match candidate.device_type {
        vk::PhysicalDeviceType::INTEGRATED_GPU => score += 10,
        vk::PhysicalDeviceType::DISCRETE_GPU => score += 5,
        _ => {}
    }
    score
}

/// Index of the first strictly highest non-zero score
pub fn pick_best_device(scores: &[u32]) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (index, &score) in scores.iter().enumerate() {
        if score == 0 {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((index, score)),
        }
    }
    best.map(|(index, _)| index)
}

// ===== SWAPCHAIN =====

/// Preferred swapchain format: 8-bit BGRA UNORM with sRGB non-linear color space
pub const PREFERRED_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_UNORM,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Choose the swapchain surface format
///
/// A single `UNDEFINED` entry means the surface accepts anything, so the
/// preferred format is used. Otherwise the preferred format if listed, else the
/// first one. `None` when the surface reports no format.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    if let [only] = formats {
        if only.format == vk::Format::UNDEFINED {
            return Some(PREFERRED_SURFACE_FORMAT);
        }
    }

    formats
        .iter()
        .find(|f| {
            f.format == PREFERRED_SURFACE_FORMAT.format && f.color_space == PREFERRED_SURFACE_FORMAT.color_space
        })
        .or_else(|| formats.first())
        .copied()
}

/// MAILBOX, then IMMEDIATE, then FIFO (always available)
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
        .into_iter()
        .find(|mode| modes.contains(mode))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// Swapchain extent: the surface's current extent when defined, else the
/// window size clamped to the surface bounds
pub fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, window_size: (u32, u32)) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    let min = capabilities.min_image_extent;
    let max = capabilities.max_image_extent;
    vk::Extent2D {
        width: window_size.0.clamp(min.width, max.width.max(min.width)),
        height: window_size.1.clamp(min.height, max.height.max(min.height)),
    }
}

/// One image above the minimum, capped by the maximum when there is one
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// CONCURRENT across both families when they differ, EXCLUSIVE otherwise
pub fn choose_sharing_mode(graphics: u32, present: u32) -> (vk::SharingMode, Vec<u32>) {
    if graphics != present {
        (vk::SharingMode::CONCURRENT, vec![graphics, present])
    } else {
        (vk::SharingMode::EXCLUSIVE, Vec::new())
    }
}

// ===== DEPTH =====

/// Depth formats in order of preference
pub const DEPTH_FORMAT_CANDIDATES: [vk::Format; 5] = [
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D32_SFLOAT,
    vk::Format::D24_UNORM_S8_UINT,
    vk::Format::D16_UNORM_S8_UINT,
    vk::Format::D16_UNORM,
];

/// First candidate whose optimal tiling supports depth-stencil attachments
pub fn choose_depth_format(
    candidates: &[vk::Format],
    mut properties: impl FnMut(vk::Format) -> vk::FormatProperties,
) -> Option<vk::Format> {
    candidates.iter().copied().find(|&format| {
        properties(format)
            .optimal_tiling_features
            .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
    })
}

pub fn has_stencil_component(format: vk::Format) -> bool {
    matches!(
        format,
        vk::Format::D32_SFLOAT_S8_UINT | vk::Format::D24_UNORM_S8_UINT | vk::Format::D16_UNORM_S8_UINT
    )
}

// ===== MEMORY & IMAGES =====

/// First memory type allowed by `type_bits` that has every `required` flag
pub fn find_memory_type(
    type_bits: u32,
    properties: &vk::PhysicalDeviceMemoryProperties,
    required: vk::MemoryPropertyFlags,
) -> Option<u32> {
    let count = (properties.memory_type_count as usize).min(properties.memory_types.len());
    properties.memory_types[..count]
        .iter()
        .enumerate()
        .find(|(index, memory_type)| {
            type_bits & (1 << index) != 0 && memory_type.property_flags.contains(required)
        })
        .map(|(index, _)| index as u32)
}

/// Access masks and stages of one supported image layout transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutTransition {
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
    pub src_stage: vk::PipelineStageFlags,
    pub dst_stage: vk::PipelineStageFlags,
}

/// Barrier parameters for `old -> new`, `None` for unsupported pairs
pub fn layout_transition(old: vk::ImageLayout, new: vk::ImageLayout) -> Option<LayoutTransition> {
    use vk::ImageLayout as L;

    let (src_access, dst_access, src_stage, dst_stage) = match (old, new) {
        (L::UNDEFINED, L::TRANSFER_DST_OPTIMAL) => (
            vk::AccessFlags::empty(),
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
        ),
        (L::TRANSFER_DST_OPTIMAL, L::SHADER_READ_ONLY_OPTIMAL) => (
            vk::AccessFlags::TRANSFER_WRITE,
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
        (L::TRANSFER_DST_OPTIMAL, L::TRANSFER_SRC_OPTIMAL) => (
            vk::AccessFlags::TRANSFER_WRITE,
            vk::AccessFlags::TRANSFER_READ,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::TRANSFER,
        ),
        (L::TRANSFER_SRC_OPTIMAL, L::SHADER_READ_ONLY_OPTIMAL) => (
            vk::AccessFlags::TRANSFER_READ,
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
        (L::UNDEFINED, L::DEPTH_STENCIL_ATTACHMENT_OPTIMAL) => (
            vk::AccessFlags::empty(),
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
        ),
        _ => return None,
    };

    Some(LayoutTransition { src_access, dst_access, src_stage, dst_stage })
}

/// Image aspect touched by a layout transition of `format`
pub fn transition_aspect(new_layout: vk::ImageLayout, format: vk::Format) -> vk::ImageAspectFlags {
    if new_layout == vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL {
        if has_stencil_component(format) {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        } else {
            vk::ImageAspectFlags::DEPTH
        }
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

/// Whether mip generation by linear blit is possible for a format
pub fn supports_linear_blit(properties: &vk::FormatProperties) -> bool {
    properties
        .optimal_tiling_features
        .contains(vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR)
}

/// Round `size` up to a multiple of `alignment` (0 or 1 leave it unchanged)
pub fn align_up(size: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        size
    } else {
        size.div_ceil(alignment) * alignment
    }
}

/// Extent of mip level `level` of a `width` x `height` image, never below 1
pub fn mip_extent(width: u32, height: u32, level: u32) -> (u32, u32) {
    let shrink = |size: u32| size.checked_shr(level).unwrap_or(0).max(1);
    (shrink(width), shrink(height))
}

/// Requested mip count limited to `1..=` the full chain of the image
pub fn clamp_mip_levels(width: u32, height: u32, requested: u32) -> u32 {
    requested.clamp(1, mip_level_count(width, height))
}

#[cfg(test)]
#[path = "vulkan_selection_tests.rs"]
mod tests;
