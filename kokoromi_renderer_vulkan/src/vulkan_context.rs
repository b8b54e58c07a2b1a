/// DeviceContext - instance, surface, device, queues and allocator of one renderer
///
/// Shared (via `Arc`) by every GPU resource so the device outlives all of
/// them. The context destroys itself in reverse creation order when the last
/// reference is dropped.

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::{c_char, CStr, CString};
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex, MutexGuard};
use kokoromi_engine::kokoromi::{Error, Result};
use kokoromi_engine::kokoromi::render::RendererConfig;
use kokoromi_engine::{engine_bail_init, engine_error, engine_info, engine_debug, engine_err};

use crate::vulkan_selection::{
    find_queue_families, pick_best_device, score_device, DeviceCandidate, QueueFamilyIndices,
};

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Resolved queue family roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

/// Whether validation is compiled in and requested
pub fn validation_active(config: &RendererConfig) -> bool {
    cfg!(feature = "vulkan-validation") && config.enable_validation
}

pub struct DeviceContext {
    _entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,

    pub(crate) surface_loader: ash::khr::surface::Instance,
    pub(crate) surface: vk::SurfaceKHR,

    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) properties: vk::PhysicalDeviceProperties,
    pub(crate) memory_properties: vk::PhysicalDeviceMemoryProperties,
    pub(crate) queue_families: QueueFamilies,

    pub(crate) device: ash::Device,
    pub(crate) graphics_queue: vk::Queue,
    pub(crate) present_queue: vk::Queue,
    pub(crate) swapchain_loader: ash::khr::swapchain::Device,

    /// Dropped explicitly before the device is destroyed
    allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Pool for one-shot upload command buffers (TRANSIENT + RESET_COMMAND_BUFFER)
    upload_pool: Mutex<vk::CommandPool>,
}

impl DeviceContext {
    /// Create the instance, surface and logical device for `window`
    ///
    /// Every failure is an initialization error: there is no fallback device.
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(window: &W, config: &RendererConfig) -> Result<Arc<Self>> {
        unsafe {
            let entry = ash::Entry::load().map_err(|e| {
                engine_error!("kokoromi::vulkan", "Failed to load Vulkan library: {:?}", e);
                Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
            })?;

            let validation = validation_active(config);
            if validation && !Self::has_validation_layer(&entry)? {
                engine_bail_init!(
                    "kokoromi::vulkan",
                    "Validation requested but {} is not installed",
                    VALIDATION_LAYER.to_string_lossy()
                );
            }

            let display_handle = window.display_handle().map_err(|e| {
                engine_error!("kokoromi::vulkan", "Failed to get display handle: {}", e);
                Error::InitializationFailed(format!("Failed to get display handle: {}", e))
            })?;
            let window_handle = window.window_handle().map_err(|e| {
                engine_error!("kokoromi::vulkan", "Failed to get window handle: {}", e);
                Error::InitializationFailed(format!("Failed to get window handle: {}", e))
            })?;

            let instance = Self::create_instance(&entry, display_handle.as_raw(), config, validation)?;

            let debug_messenger = if validation {
                Some(Self::create_debug_messenger(&entry, &instance, config)?)
            } else {
                None
            };

            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                engine_error!("kokoromi::vulkan", "Failed to create surface: {:?}", e);
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })?;
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            let (physical_device, queue_families) =
                Self::select_physical_device(&instance, &surface_loader, surface)?;
            let properties = instance.get_physical_device_properties(physical_device);
            let memory_properties = instance.get_physical_device_memory_properties(physical_device);

            let device = Self::create_logical_device(&instance, physical_device, queue_families, validation)?;
            let graphics_queue = device.get_device_queue(queue_families.graphics, 0);
            let present_queue = device.get_device_queue(queue_families.present, 0);
            let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                engine_error!("kokoromi::vulkan", "Failed to create GPU allocator: {:?}", e);
                Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            let upload_pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(queue_families.graphics)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let upload_pool = device.create_command_pool(&upload_pool_info, None).map_err(|e| {
                engine_error!("kokoromi::vulkan", "Failed to create upload command pool: {:?}", e);
                Error::InitializationFailed(format!("Failed to create upload command pool: {:?}", e))
            })?;

            let device_name = properties
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            engine_info!(
                "kokoromi::vulkan",
                "Using {} ({:?}), graphics family {}, present family {}",
                device_name,
                properties.device_type,
                queue_families.graphics,
                queue_families.present
            );

            Ok(Arc::new(Self {
                _entry: entry,
                instance,
                debug_messenger,
                surface_loader,
                surface,
                physical_device,
                properties,
                memory_properties,
                queue_families,
                device,
                graphics_queue,
                present_queue,
                swapchain_loader,
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                upload_pool: Mutex::new(upload_pool),
            }))
        }
    }

    unsafe fn has_validation_layer(entry: &ash::Entry) -> Result<bool> {
        let layers = entry.enumerate_instance_layer_properties().map_err(|e| {
            engine_error!("kokoromi::vulkan", "Failed to enumerate instance layers: {:?}", e);
            Error::InitializationFailed(format!("Failed to enumerate instance layers: {:?}", e))
        })?;

        Ok(layers
            .iter()
            .any(|layer| layer.layer_name_as_c_str().map(|name| name == VALIDATION_LAYER).unwrap_or(false)))
    }

    unsafe fn create_instance(
        entry: &ash::Entry,
        display_handle: raw_window_handle::RawDisplayHandle,
        config: &RendererConfig,
        validation: bool,
    ) -> Result<ash::Instance> {
        let app_name = CString::new(config.app_name.as_str()).map_err(|e| {
            engine_error!("kokoromi::vulkan", "Invalid application name: {}", e);
            Error::InitializationFailed(format!("Invalid application name: {}", e))
        })?;

        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(config.app_version)
            .engine_name(c"Kokoromi")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_3);

        let mut extension_names = ash_window::enumerate_required_extensions(display_handle)
            .map_err(|e| {
                engine_error!("kokoromi::vulkan", "Failed to get required extensions: {}", e);
                Error::InitializationFailed(format!("Failed to get required extensions: {}", e))
            })?
            .to_vec();
        if validation {
            extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
        }

        let layer_names: Vec<*const c_char> = if validation {
            vec![VALIDATION_LAYER.as_ptr()]
        } else {
            Vec::new()
        };

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_names)
            .enabled_extension_names(&extension_names);

        entry.create_instance(&create_info, None).map_err(|e| {
            engine_error!("kokoromi::vulkan", "Failed to create Vulkan instance: {:?}", e);
            Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
        })
    }

    unsafe fn create_debug_messenger(
        entry: &ash::Entry,
        instance: &ash::Instance,
        config: &RendererConfig,
    ) -> Result<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)> {
        let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);
        crate::debug::init_debug_config(config.validation_severity);

        let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(crate::debug::severity_flags(config.validation_severity))
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

        let messenger = debug_utils
            .create_debug_utils_messenger(&debug_info, None)
            .map_err(|e| {
                engine_error!("kokoromi::vulkan", "Failed to create debug messenger: {:?}", e);
                Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
            })?;

        Ok((debug_utils, messenger))
    }

    /// Score every physical device and keep the first strictly best one
    unsafe fn select_physical_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
    ) -> Result<(vk::PhysicalDevice, QueueFamilies)> {
        let devices = instance.enumerate_physical_devices().map_err(|e| {
            engine_error!("kokoromi::vulkan", "Failed to enumerate physical devices: {:?}", e);
            Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
        })?;

        let evaluated: Vec<(DeviceCandidate, QueueFamilyIndices)> = devices
            .iter()
            .map(|&device| Self::evaluate_device(instance, surface_loader, surface, device))
            .collect();
        let scores: Vec<u32> = evaluated.iter().map(|(candidate, _)| score_device(candidate)).collect();

        for (device, score) in devices.iter().zip(&scores) {
            let properties = instance.get_physical_device_properties(*device);
            engine_debug!(
                "kokoromi::vulkan",
                "Candidate {:?} ({:?}) scored {}",
                properties.device_name_as_c_str().unwrap_or(c"?"),
                properties.device_type,
                score
            );
        }

        let Some(best) = pick_best_device(&scores) else {
            engine_bail_init!("kokoromi::vulkan", "No suitable GPU found ({} candidates)", devices.len());
        };

        let indices = evaluated[best].1;
        match (indices.graphics, indices.present) {
            (Some(graphics), Some(present)) => Ok((devices[best], QueueFamilies { graphics, present })),
            _ => engine_bail_init!("kokoromi::vulkan", "Selected GPU has incomplete queue families"),
        }
    }

    unsafe fn evaluate_device(
        instance: &ash::Instance,
        surface_loader: &ash::khr::surface::Instance,
        surface: vk::SurfaceKHR,
        device: vk::PhysicalDevice,
    ) -> (DeviceCandidate, QueueFamilyIndices) {
        let properties = instance.get_physical_device_properties(device);
        let features = instance.get_physical_device_features(device);
        let families = instance.get_physical_device_queue_family_properties(device);

        let indices = find_queue_families(&families, |index| {
            surface_loader
                .get_physical_device_surface_support(device, index, surface)
                .unwrap_or(false)
        });

        let swapchain_supported = instance
            .enumerate_device_extension_properties(device)
            .map(|extensions| {
                extensions.iter().any(|ext| {
                    ext.extension_name_as_c_str()
                        .map(|name| name == ash::khr::swapchain::NAME)
                        .unwrap_or(false)
                })
            })
            .unwrap_or(false);

        // Surface queries are only valid once the extension is known to exist
        let surface_adequate = swapchain_supported
            && !surface_loader
                .get_physical_device_surface_formats(device, surface)
                .unwrap_or_default()
                .is_empty()
            && !surface_loader
                .get_physical_device_surface_present_modes(device, surface)
                .unwrap_or_default()
                .is_empty();

        let candidate = DeviceCandidate {
            device_type: properties.device_type,
            queues_complete: indices.is_complete(),
            swapchain_supported,
            surface_adequate,
            sampler_anisotropy: features.sampler_anisotropy == vk::TRUE,
        };

        (candidate, indices)
    }

    /// One queue per unique family, swapchain extension, sampler anisotropy
    unsafe fn create_logical_device(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        families: QueueFamilies,
        validation: bool,
    ) -> Result<ash::Device> {
        let indices = QueueFamilyIndices {
            graphics: Some(families.graphics),
            present: Some(families.present),
        };
        let queue_priorities = [1.0];
        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = indices
            .unique()
            .into_iter()
            .map(|family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
            })
            .collect();

        let extension_names = [ash::khr::swapchain::NAME.as_ptr()];
        let layer_names: Vec<*const c_char> = if validation {
            vec![VALIDATION_LAYER.as_ptr()]
        } else {
            Vec::new()
        };
        let features = vk::PhysicalDeviceFeatures::default().sampler_anisotropy(true);

        #[allow(deprecated)]
        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names)
            .enabled_layer_names(&layer_names)
            .enabled_features(&features);

        instance.create_device(physical_device, &create_info, None).map_err(|e| {
            engine_error!("kokoromi::vulkan", "Failed to create logical device: {:?}", e);
            Error::InitializationFailed(format!("Failed to create device: {:?}", e))
        })
    }

    /// Lock the GPU memory allocator
    pub(crate) fn allocator(&self) -> Result<MutexGuard<'_, Allocator>> {
        self.allocator
            .lock()
            .map_err(|_| engine_err!("kokoromi::vulkan", "GPU allocator mutex poisoned"))
    }

    /// Lock the upload command pool
    pub(crate) fn upload_pool(&self) -> Result<MutexGuard<'_, vk::CommandPool>> {
        self.upload_pool
            .lock()
            .map_err(|_| engine_err!("kokoromi::vulkan", "Upload command pool mutex poisoned"))
    }

    pub(crate) fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device
                .device_wait_idle()
                .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to wait idle: {:?}", e))
        }
    }

    pub(crate) fn surface_capabilities(&self) -> Result<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, self.surface)
                .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to get surface capabilities: {:?}", e))
        }
    }

    pub(crate) fn surface_formats(&self) -> Result<Vec<vk::SurfaceFormatKHR>> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_formats(self.physical_device, self.surface)
                .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to query surface formats: {:?}", e))
        }
    }

    pub(crate) fn present_modes(&self) -> Result<Vec<vk::PresentModeKHR>> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_present_modes(self.physical_device, self.surface)
                .map_err(|e| engine_err!("kokoromi::vulkan", "Failed to query present modes: {:?}", e))
        }
    }

    pub(crate) fn format_properties(&self, format: vk::Format) -> vk::FormatProperties {
        unsafe {
            self.instance
                .get_physical_device_format_properties(self.physical_device, format)
        }
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            let pool = *self.upload_pool.get_mut().unwrap_or_else(|e| e.into_inner());
            self.device.destroy_command_pool(pool, None);

            // Frees every memory block while the device still exists
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);
            self.surface_loader.destroy_surface(self.surface, None);

            if let Some((debug_utils, messenger)) = self.debug_messenger.take() {
                crate::debug::cleanup_debug_config();
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.instance.destroy_instance(None);
        }
    }
}
