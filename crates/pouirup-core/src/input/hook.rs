// pouirup Input Hook
// evdev event loop that intercepts, reports and forwards device input

use std::collections::HashSet;
use std::mem;
use std::os::unix::io::AsRawFd;
use std::sync::Arc;
use std::time::Instant;

use evdev::{AbsoluteAxisType, Device, EventType, InputEvent, PropType, RelativeAxisType};
use parking_lot::Mutex;

use super::device::{DeviceCapabilities, DeviceKind};
use super::event::{Button, ClickCounter, HookEvent, HookHandler};
use super::filter::matches_device_filter;
use super::multitouch::MultitouchDecoder;
use crate::action::Action;
use crate::geometry::{Position, Vector2};
use crate::output::{OutputError, VirtualDevice};
use crate::remap::EngineError;
use crate::Key;

/// Wheel units per detent on the high-resolution axes
const HI_RES_PER_DETENT: f64 = 120.0;
const SYN_REPORT: u16 = 0;
const SYN_DROPPED: u16 = 3;

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("no usable input devices found")]
    NoDevices,

    #[error("cannot grab {device}: {source}")]
    Grab {
        device: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// How the hook treats devices of one kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceUse {
    Ignore,
    /// Read events without taking them away from the system
    Observe,
    /// Take exclusive ownership and forward what is not suppressed
    Grab,
}

#[derive(Debug, Clone)]
pub struct HookOptions {
    pub keyboards: DeviceUse,
    pub mice: DeviceUse,
    pub touchpads: DeviceUse,
    /// Device names or paths; empty autodetects
    pub device_filter: Vec<String>,
}

impl HookOptions {
    fn usage(&self, kind: DeviceKind) -> DeviceUse {
        match kind {
            DeviceKind::Keyboard => self.keyboards,
            DeviceKind::Mouse => self.mice,
            DeviceKind::Touchpad => self.touchpads,
        }
    }
}

/// A detected input device, for `--list-devices`
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub kind: DeviceKind,
}

struct HookDevice {
    device: Device,
    name: String,
    kind: DeviceKind,
    usage: DeviceUse,
    grabbed: bool,
    /// Events of the current SYN frame waiting to be forwarded
    frame: Vec<InputEvent>,
    motion: Vector2,
    wheel: Vector2,
    wheel_hi_res: Vector2,
    wheel_events: Vec<InputEvent>,
    touch: Option<MultitouchDecoder>,
}

fn capabilities(device: &Device) -> DeviceCapabilities {
    let keys: HashSet<u16> = device
        .supported_keys()
        .map(|keys| keys.iter().map(|k| k.code()).collect())
        .unwrap_or_default();
    let relative_motion = device.supported_relative_axes().map_or(false, |axes| {
        axes.contains(RelativeAxisType::REL_X) && axes.contains(RelativeAxisType::REL_Y)
    });
    let multitouch = device.supported_absolute_axes().map_or(false, |axes| {
        axes.contains(AbsoluteAxisType::ABS_MT_POSITION_X)
            && axes.contains(AbsoluteAxisType::ABS_MT_POSITION_Y)
    });
    DeviceCapabilities {
        keys,
        relative_motion,
        multitouch,
        direct: device.properties().contains(PropType::DIRECT),
    }
}

fn touch_decoder(device: &Device) -> MultitouchDecoder {
    let resolution = |axis: AbsoluteAxisType| -> i32 {
        device
            .get_abs_state()
            .ok()
            .and_then(|state| state.get(axis.0 as usize).map(|info| info.resolution))
            .unwrap_or(0)
    };
    MultitouchDecoder::new(
        resolution(AbsoluteAxisType::ABS_MT_POSITION_X),
        resolution(AbsoluteAxisType::ABS_MT_POSITION_Y),
    )
}

/// Detected devices with their kind, virtual devices excluded
fn detect(filter: &[String]) -> Vec<(String, Device, DeviceKind)> {
    let mut found = Vec::new();
    for (path, device) in evdev::enumerate() {
        let name = device.name().unwrap_or("Unknown").to_string();
        let path = path.to_str().unwrap_or_default().to_string();
        let kind = capabilities(&device).classify();
        if !matches_device_filter(&name, &path, filter, kind) {
            continue;
        }
        if let Some(kind) = kind {
            found.push((path, device, kind));
        }
    }
    found
}

/// Input hook over evdev devices.
///
/// Grabbed devices are exclusively ours: every event the handler does not
/// suppress is forwarded to the virtual device. Observed devices are only
/// reported. Devices are ungrabbed on drop.
pub struct InputHook {
    devices: Vec<HookDevice>,
    poll_fds: Vec<libc::pollfd>,
    output: Arc<Mutex<VirtualDevice>>,
    clicks: ClickCounter,
    cursor: Position,
    active: bool,
}

impl InputHook {
    /// Open the devices selected by `options`. Interception starts with
    /// [`activate`](Self::activate).
    pub fn open(options: &HookOptions, output: Arc<Mutex<VirtualDevice>>) -> Result<Self, HookError> {
        let mut devices = Vec::new();
        for (path, device, kind) in detect(&options.device_filter) {
            let usage = options.usage(kind);
            if usage == DeviceUse::Ignore {
                continue;
            }
            let name = device.name().unwrap_or("Unknown").to_string();
            log::info!("Using {} {} ({}, {:?})", kind, name, path, usage);
            let touch = (kind == DeviceKind::Touchpad).then(|| touch_decoder(&device));
            devices.push(HookDevice {
                device,
                name,
                kind,
                usage,
                grabbed: false,
                frame: Vec::new(),
                motion: Vector2::ZERO,
                wheel: Vector2::ZERO,
                wheel_hi_res: Vector2::ZERO,
                wheel_events: Vec::new(),
                touch,
            });
        }
        if devices.is_empty() {
            return Err(HookError::NoDevices);
        }

        let poll_fds = devices
            .iter()
            .map(|d| libc::pollfd {
                fd: d.device.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            })
            .collect();
        Ok(Self {
            devices,
            poll_fds,
            output,
            clicks: ClickCounter::new(),
            cursor: Position::ZERO,
            active: false,
        })
    }

    /// Every classified device, for `--list-devices`
    pub fn list_devices() -> Vec<DeviceInfo> {
        detect(&[])
            .into_iter()
            .map(|(path, device, kind)| DeviceInfo {
                name: device.name().unwrap_or("Unknown").to_string(),
                path,
                kind,
            })
            .collect()
    }

    /// Start intercepting: grab every device configured for grabbing.
    pub fn activate(&mut self) -> Result<(), HookError> {
        for dev in &mut self.devices {
            if dev.usage != DeviceUse::Grab || dev.grabbed {
                continue;
            }
            // a crashed previous instance may have left the grab behind
            let _ = dev.device.ungrab();
            dev.device.grab().map_err(|source| HookError::Grab {
                device: dev.name.clone(),
                source,
            })?;
            dev.grabbed = true;
            log::debug!("Grabbed {}", dev.name);
        }
        self.active = true;
        log::info!("Input interception active");
        Ok(())
    }

    /// Stop intercepting and hand every device back to the system.
    pub fn deactivate(&mut self) {
        for dev in &mut self.devices {
            if dev.grabbed {
                let _ = dev.device.ungrab();
                dev.grabbed = false;
                log::debug!("Released {}", dev.name);
            }
            dev.frame.clear();
            dev.wheel_events.clear();
        }
        if self.active {
            log::info!("Input interception inactive");
        }
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Cursor position integrated from relative motion, in pixels
    pub fn cursor_position(&self) -> Position {
        self.cursor
    }

    pub fn device_names(&self) -> Vec<String> {
        self.devices.iter().map(|d| d.name.clone()).collect()
    }

    /// Wait up to `timeout_ms` for input and dispatch it to `handler`.
    ///
    /// EINTR counts as a timeout so signal flags can be checked by the
    /// caller between polls.
    pub fn poll(&mut self, timeout_ms: i32, handler: &mut dyn HookHandler) -> Result<(), HookError> {
        let ready = unsafe {
            libc::poll(
                self.poll_fds.as_mut_ptr(),
                self.poll_fds.len() as libc::nfds_t,
                timeout_ms,
            )
        };
        if ready < 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                return Ok(());
            }
            return Err(HookError::Io(err));
        }
        if ready == 0 {
            return Ok(());
        }

        for index in 0..self.devices.len() {
            if self.poll_fds[index].revents & libc::POLLIN == 0 {
                continue;
            }
            let fetched: std::io::Result<Vec<InputEvent>> = self.devices[index]
                .device
                .fetch_events()
                .map(|events| events.collect());
            let events = match fetched {
                Ok(events) => events,
                Err(e) => {
                    log::warn!("Read from {} failed: {}", self.devices[index].name, e);
                    continue;
                }
            };
            if !self.active {
                continue;
            }
            let now = Instant::now();
            for event in events {
                self.process(index, event, now, handler)?;
            }
        }
        Ok(())
    }

    fn process(
        &mut self,
        index: usize,
        event: InputEvent,
        now: Instant,
        handler: &mut dyn HookHandler,
    ) -> Result<(), HookError> {
        let code = event.code();
        match event.event_type() {
            EventType::KEY => {
                // touchpad clicks and tool bits belong to the system
                if self.devices[index].kind == DeviceKind::Touchpad {
                    return Ok(());
                }
                let Some(hook_event) = self.key_event(code, event.value(), now) else {
                    self.devices[index].frame.push(event);
                    return Ok(());
                };
                if !handler.handle(hook_event, now)? {
                    self.devices[index].frame.push(event);
                }
            }
            EventType::RELATIVE => {
                let dev = &mut self.devices[index];
                let value = f64::from(event.value());
                match RelativeAxisType(code) {
                    RelativeAxisType::REL_X => {
                        dev.motion.x += value;
                        dev.frame.push(event);
                    }
                    RelativeAxisType::REL_Y => {
                        dev.motion.y += value;
                        dev.frame.push(event);
                    }
                    RelativeAxisType::REL_WHEEL => {
                        dev.wheel.y += value;
                        dev.wheel_events.push(event);
                    }
                    RelativeAxisType::REL_HWHEEL => {
                        dev.wheel.x += value;
                        dev.wheel_events.push(event);
                    }
                    RelativeAxisType::REL_WHEEL_HI_RES => {
                        dev.wheel_hi_res.y += value;
                        dev.wheel_events.push(event);
                    }
                    RelativeAxisType::REL_HWHEEL_HI_RES => {
                        dev.wheel_hi_res.x += value;
                        dev.wheel_events.push(event);
                    }
                    _ => dev.frame.push(event),
                }
            }
            EventType::ABSOLUTE => {
                if let Some(touch) = self.devices[index].touch.as_mut() {
                    touch.feed(code, event.value());
                }
            }
            EventType::SYNCHRONIZATION => match code {
                SYN_REPORT => self.end_frame(index, now, handler)?,
                SYN_DROPPED => {
                    let dev = &mut self.devices[index];
                    dev.frame.clear();
                    dev.wheel_events.clear();
                }
                _ => {}
            },
            // scan codes would describe the physical key, not what we emit
            EventType::MISC => {}
            _ => self.devices[index].frame.push(event),
        }
        Ok(())
    }

    fn key_event(&mut self, code: u16, value: i32, now: Instant) -> Option<HookEvent> {
        let action = Action::from_value(value)?;
        if let Some(button) = Button::from_code(code) {
            return match action {
                Action::Press => Some(HookEvent::ButtonPress {
                    button,
                    click_level: self.clicks.press(button, now),
                    position: self.cursor,
                }),
                Action::Release => Some(HookEvent::ButtonRelease {
                    button,
                    click_level: self.clicks.release(button),
                }),
                Action::Repeat => None,
            };
        }
        Some(action.key_event(Key(code)))
    }

    fn end_frame(&mut self, index: usize, now: Instant, handler: &mut dyn HookHandler) -> Result<(), HookError> {
        let dev = &mut self.devices[index];
        let motion = mem::take(&mut dev.motion);
        let wheel = mem::take(&mut dev.wheel);
        let wheel_hi_res = mem::take(&mut dev.wheel_hi_res);
        let wheel_events = mem::take(&mut dev.wheel_events);
        let mut frame = mem::take(&mut dev.frame);
        let fingers = dev.touch.as_mut().and_then(MultitouchDecoder::frame);
        let forwarding = dev.grabbed;

        if motion != Vector2::ZERO {
            self.cursor = self.cursor + motion;
            handler.handle(HookEvent::CursorMove { position: self.cursor }, now)?;
        }

        if !wheel_events.is_empty() {
            // smooth scrolling reports only hi-res steps between detents
            let continuous = wheel == Vector2::ZERO;
            let delta = if continuous {
                wheel_hi_res / HI_RES_PER_DETENT
            } else {
                wheel
            };
            let scroll = HookEvent::WheelScroll {
                delta,
                continuous,
                momentum: false,
            };
            if !handler.handle(scroll, now)? {
                frame.extend(wheel_events);
            }
        }

        if let Some(fingers) = fingers {
            handler.handle(HookEvent::FingerPositions(fingers), now)?;
        }

        if forwarding && !frame.is_empty() {
            self.output.lock().forward(&frame)?;
        }
        Ok(())
    }
}

impl Drop for InputHook {
    fn drop(&mut self) {
        self.deactivate();
    }
}
