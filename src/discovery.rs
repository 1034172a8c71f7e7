//! # Device Port Discovery
//!
//! Binds the positioning receiver and the radio modem to serial device paths
//! by matching vendor-derived names in the persistent-identifier directory
//! (`/dev/serial/by-id`) instead of enumeration order, which changes across
//! reboots and replugs. Devices that attach shortly after startup are picked
//! up by retrying the scan.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Result, TelemetryError};

/// Default persistent-identifier directory on Linux
pub const DEFAULT_BY_ID_DIR: &str = "/dev/serial/by-id";

/// Role a serial device plays on a field node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRole {
    /// GPS receiver producing NMEA sentences
    Positioning,
    /// Long-range radio modem
    Radio,
}

impl fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positioning => write!(f, "positioning"),
            Self::Radio => write!(f, "radio"),
        }
    }
}

/// A role's match keyword and, once found, its real device path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceBinding {
    pub role: DeviceRole,
    pub match_keyword: String,
    pub resolved_path: Option<PathBuf>,
}

impl DeviceBinding {
    pub fn new(role: DeviceRole, match_keyword: impl Into<String>) -> Self {
        Self {
            role,
            match_keyword: match_keyword.into(),
            resolved_path: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_path.is_some()
    }
}

/// Both device paths of a field node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDevices {
    pub positioning: PathBuf,
    pub radio: PathBuf,
}

/// How often and how many times to scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub scan_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            scan_interval: Duration::from_secs(1),
        }
    }
}

/// Source of symbolic device links
#[cfg_attr(test, mockall::automock)]
pub trait DeviceDirectory {
    /// List the symbolic links currently present
    fn links(&self) -> io::Result<Vec<PathBuf>>;

    /// Follow a link to the real device node
    fn resolve(&self, link: &Path) -> io::Result<PathBuf>;
}

/// The persistent-identifier directory on the local filesystem
#[derive(Debug, Clone)]
pub struct ByIdDirectory {
    root: PathBuf,
}

impl ByIdDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for ByIdDirectory {
    fn default() -> Self {
        Self::new(DEFAULT_BY_ID_DIR)
    }
}

impl DeviceDirectory for ByIdDirectory {
    fn links(&self) -> io::Result<Vec<PathBuf>> {
        // The directory only exists while at least one USB serial device is attached
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut links = entries
            .map(|entry| entry.map(|e| e.path()))
            .collect::<io::Result<Vec<_>>>()?;
        links.sort();
        Ok(links)
    }

    fn resolve(&self, link: &Path) -> io::Result<PathBuf> {
        std::fs::canonicalize(link)
    }
}

/// Resolve the positioning and radio devices
///
/// # Arguments
///
/// * `directory` - Where to look for device links
/// * `positioning_keyword` - Substring identifying the GPS receiver link
/// * `radio_keyword` - Substring identifying the radio modem link
/// * `policy` - Attempt bound and delay between scans
///
/// # Errors
///
/// Returns `TelemetryError::DeviceNotFound` listing every role still
/// unresolved after the last attempt.
pub async fn resolve_devices<D: DeviceDirectory>(
    directory: &D,
    positioning_keyword: &str,
    radio_keyword: &str,
    policy: &RetryPolicy,
) -> Result<ResolvedDevices> {
    let mut bindings = [
        DeviceBinding::new(DeviceRole::Positioning, positioning_keyword),
        DeviceBinding::new(DeviceRole::Radio, radio_keyword),
    ];
    resolve_bindings(directory, &mut bindings, policy).await?;

    let [positioning, radio] = bindings;
    match (positioning.resolved_path, radio.resolved_path) {
        (Some(positioning), Some(radio)) => Ok(ResolvedDevices { positioning, radio }),
        // resolve_bindings only returns Ok once every binding has a path
        _ => Err(TelemetryError::DeviceNotFound {
            roles: vec![DeviceRole::Positioning, DeviceRole::Radio],
        }),
    }
}

/// Scan until every binding is resolved or the attempts run out
///
/// A binding resolved on one attempt stays resolved; later attempts only
/// look for the remaining roles. Returns as soon as all are resolved.
pub async fn resolve_bindings<D: DeviceDirectory>(
    directory: &D,
    bindings: &mut [DeviceBinding],
    policy: &RetryPolicy,
) -> Result<()> {
    for attempt in 1..=policy.max_attempts {
        scan_once(directory, bindings);

        if bindings.iter().all(DeviceBinding::is_resolved) {
            info!("All devices resolved on attempt {}/{}", attempt, policy.max_attempts);
            return Ok(());
        }

        if attempt < policy.max_attempts {
            debug!(
                "Attempt {}/{}: waiting for {}",
                attempt,
                policy.max_attempts,
                unresolved_roles(bindings)
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            tokio::time::sleep(policy.scan_interval).await;
        }
    }

    Err(TelemetryError::DeviceNotFound {
        roles: unresolved_roles(bindings),
    })
}

fn unresolved_roles(bindings: &[DeviceBinding]) -> Vec<DeviceRole> {
    bindings
        .iter()
        .filter(|b| !b.is_resolved())
        .map(|b| b.role)
        .collect()
}

/// One pass over the directory listing for every unresolved binding
fn scan_once<D: DeviceDirectory>(directory: &D, bindings: &mut [DeviceBinding]) {
    let links = match directory.links() {
        Ok(links) => links,
        Err(e) => {
            warn!("Failed to list device links: {}", e);
            return;
        }
    };

    for binding in bindings.iter_mut().filter(|b| !b.is_resolved()) {
        for link in &links {
            let matches = link
                .file_name()
                .map(|name| name.to_string_lossy().contains(&binding.match_keyword))
                .unwrap_or(false);
            if !matches {
                continue;
            }

            match directory.resolve(link) {
                Ok(path) => {
                    info!(
                        "Resolved {} device via {} -> {}",
                        binding.role,
                        link.display(),
                        path.display()
                    );
                    binding.resolved_path = Some(path);
                    break;
                }
                Err(e) => warn!("Failed to resolve {}: {}", link.display(), e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GPS_LINK: &str = "/dev/serial/by-id/usb-Prolific_Technology_Inc._USB-Serial_Controller-if00-port0";
    const LORA_LINK: &str = "/dev/serial/by-id/usb-Silicon_Labs_CP2102_USB_to_UART_Bridge_Controller_0001-if00-port0";

    fn policy() -> RetryPolicy {
        RetryPolicy::default()
    }

    fn resolve_by_table(link: &Path) -> io::Result<PathBuf> {
        match link.to_str() {
            Some(GPS_LINK) => Ok(PathBuf::from("/dev/ttyUSB1")),
            Some(LORA_LINK) => Ok(PathBuf::from("/dev/ttyUSB0")),
            _ => Err(io::Error::new(io::ErrorKind::NotFound, "dangling")),
        }
    }

    #[test]
    fn test_role_display() {
        assert_eq!(DeviceRole::Positioning.to_string(), "positioning");
        assert_eq!(DeviceRole::Radio.to_string(), "radio");
    }

    #[tokio::test(start_paused = true)]
    async fn test_both_roles_on_first_attempt_scans_once() {
        let mut directory = MockDeviceDirectory::new();
        directory
            .expect_links()
            .times(1)
            .returning(|| Ok(vec![PathBuf::from(GPS_LINK), PathBuf::from(LORA_LINK)]));
        directory.expect_resolve().returning(resolve_by_table);

        let started = tokio::time::Instant::now();
        let devices = resolve_devices(&directory, "Prolific", "Silicon_Labs", &policy())
            .await
            .unwrap();

        assert_eq!(devices.positioning, PathBuf::from("/dev/ttyUSB1"));
        assert_eq!(devices.radio, PathBuf::from("/dev/ttyUSB0"));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_role_fails_after_all_attempts() {
        let mut directory = MockDeviceDirectory::new();
        directory
            .expect_links()
            .times(30)
            .returning(|| Ok(vec![PathBuf::from(LORA_LINK)]));
        directory
            .expect_resolve()
            .withf(|link| link == Path::new(LORA_LINK))
            .times(1)
            .returning(resolve_by_table);

        let started = tokio::time::Instant::now();
        let err = resolve_devices(&directory, "Prolific", "Silicon_Labs", &policy())
            .await
            .unwrap_err();

        match err {
            TelemetryError::DeviceNotFound { roles } => {
                assert_eq!(roles, vec![DeviceRole::Positioning]);
            }
            other => panic!("Expected DeviceNotFound, got: {:?}", other),
        }
        // 29 sleeps between 30 scans
        assert_eq!(started.elapsed(), Duration::from_secs(29));
    }

    #[tokio::test(start_paused = true)]
    async fn test_both_roles_missing_are_named() {
        let mut directory = MockDeviceDirectory::new();
        directory.expect_links().returning(|| Ok(Vec::new()));

        let err = resolve_devices(&directory, "Prolific", "Silicon_Labs", &policy())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("positioning, radio"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_device_is_picked_up() {
        let mut directory = MockDeviceDirectory::new();
        let mut seq = mockall::Sequence::new();
        directory
            .expect_links()
            .times(3)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![PathBuf::from(LORA_LINK)]));
        directory
            .expect_links()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![PathBuf::from(GPS_LINK), PathBuf::from(LORA_LINK)]));
        directory.expect_resolve().returning(resolve_by_table);

        let started = tokio::time::Instant::now();
        let devices = resolve_devices(&directory, "Prolific", "Silicon_Labs", &policy())
            .await
            .unwrap();

        assert_eq!(devices.positioning, PathBuf::from("/dev/ttyUSB1"));
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_listing_errors_count_as_empty_attempts() {
        let mut directory = MockDeviceDirectory::new();
        let mut seq = mockall::Sequence::new();
        directory
            .expect_links()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")));
        directory
            .expect_links()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![PathBuf::from(GPS_LINK), PathBuf::from(LORA_LINK)]));
        directory.expect_resolve().returning(resolve_by_table);

        let result = resolve_devices(&directory, "Prolific", "Silicon_Labs", &policy()).await;
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dangling_link_is_skipped() {
        let mut directory = MockDeviceDirectory::new();
        directory.expect_links().returning(|| {
            Ok(vec![
                PathBuf::from("/dev/serial/by-id/usb-Prolific_stale"),
                PathBuf::from(GPS_LINK),
                PathBuf::from(LORA_LINK),
            ])
        });
        directory.expect_resolve().returning(resolve_by_table);

        let devices = resolve_devices(&directory, "Prolific", "Silicon_Labs", &policy())
            .await
            .unwrap();
        assert_eq!(devices.positioning, PathBuf::from("/dev/ttyUSB1"));
    }

    #[tokio::test]
    async fn test_single_attempt_policy_does_not_sleep() {
        let mut directory = MockDeviceDirectory::new();
        directory.expect_links().times(1).returning(|| Ok(Vec::new()));

        let single = RetryPolicy {
            max_attempts: 1,
            scan_interval: Duration::from_secs(3600),
        };
        let mut bindings = [DeviceBinding::new(DeviceRole::Radio, "Silicon_Labs")];
        let result = resolve_bindings(&directory, &mut bindings, &single).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_by_id_directory_lists_and_resolves_links() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("ttyUSB7");
        std::fs::write(&target, b"").unwrap();
        let by_id = dir.path().join("by-id");
        std::fs::create_dir(&by_id).unwrap();
        let link = by_id.join("usb-Prolific_Technology-if00-port0");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let directory = ByIdDirectory::new(&by_id);
        let links = directory.links().unwrap();
        assert_eq!(links, vec![link.clone()]);
        assert_eq!(
            directory.resolve(&link).unwrap(),
            std::fs::canonicalize(&target).unwrap()
        );
    }

    #[test]
    fn test_missing_by_id_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let directory = ByIdDirectory::new(dir.path().join("absent"));
        assert!(directory.links().unwrap().is_empty());
    }
}
