//! One-shot hardware initialisation for the metering inputs.
//!
//! Configures the two HLW8012 pulse outputs as pulled-up inputs with a
//! rising-edge interrupt each and registers the ISR trampolines.  Called
//! once from `main()` before the worker tasks start.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
    IsrHandlerFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::IsrHandlerFailed(rc) => write!(f, "GPIO ISR handler add failed (rc={})", rc),
        }
    }
}

impl core::error::Error for HwInitError {}

impl From<HwInitError> for crate::error::Error {
    fn from(e: HwInitError) -> Self {
        // Init carries a static message only; keep the return code in the log.
        log::error!("hw_init: {}", e);
        Self::Init(match e {
            HwInitError::GpioConfigFailed(_) => "pulse GPIO config",
            HwInitError::IsrInstallFailed(_) => "GPIO ISR service",
            HwInitError::IsrHandlerFailed(_) => "pulse ISR handler",
        })
    }
}

// ── ISR trampolines ───────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn isr_now_us() -> u32 {
    // SAFETY: esp_timer_get_time is an RTC counter read; safe in ISR context.
    // Truncation to u32 is intended, every consumer uses wrapping arithmetic.
    (unsafe { esp_timer_get_time() }) as u32
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn cf_gpio_isr(_arg: *mut core::ffi::c_void) {
    crate::metering::pulse::power_pulse_isr(isr_now_us());
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn cf1_gpio_isr(_arg: *mut core::ffi::c_void) {
    crate::metering::pulse::current_pulse_isr(isr_now_us());
}

// ── Pulse inputs ──────────────────────────────────────────────

/// Configure the CF/CF1 inputs and attach their rising-edge ISRs.
#[cfg(target_os = "espidf")]
pub fn init_pulse_isrs(cf_gpio: i32, cf1_gpio: i32) -> Result<(), HwInitError> {
    // SAFETY: called once from main() before any task spawns. The handlers
    // registered below only touch the lock-free pulse channels.
    unsafe {
        for &pin in &[cf_gpio, cf1_gpio] {
            let cfg = gpio_config_t {
                pin_bit_mask: 1u64 << pin,
                mode: gpio_mode_t_GPIO_MODE_INPUT,
                pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
                pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
                intr_type: gpio_int_type_t_GPIO_INTR_POSEDGE,
                ..Default::default()
            };
            let ret = gpio_config(&cfg);
            if ret != ESP_OK as i32 {
                return Err(HwInitError::GpioConfigFailed(ret));
            }
        }

        // ESP_ERR_INVALID_STATE means the service is already installed.
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        let ret = gpio_isr_handler_add(cf_gpio, Some(cf_gpio_isr), core::ptr::null_mut());
        if ret != ESP_OK as i32 {
            return Err(HwInitError::IsrHandlerFailed(ret));
        }
        gpio_intr_enable(cf_gpio);

        let ret = gpio_isr_handler_add(cf1_gpio, Some(cf1_gpio_isr), core::ptr::null_mut());
        if ret != ESP_OK as i32 {
            return Err(HwInitError::IsrHandlerFailed(ret));
        }
        gpio_intr_enable(cf1_gpio);
    }

    info!("hw_init: pulse ISRs attached (CF=GPIO{}, CF1=GPIO{})", cf_gpio, cf1_gpio);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_pulse_isrs(cf_gpio: i32, cf1_gpio: i32) -> Result<(), HwInitError> {
    log::info!(
        "hw_init(sim): pulse ISRs skipped (CF=GPIO{}, CF1=GPIO{})",
        cf_gpio,
        cf1_gpio
    );
    Ok(())
}
