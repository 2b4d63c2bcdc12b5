// Wipe Orchestrator - watches for newly attached disks and routes each one to
// the wipe strategy for its media type.
//
// Disks are processed strictly one at a time. A disk is handled once per
// session whatever the outcome; failed wipes are not retried.

use crate::config::{AutoWipeConfig, RediscoveryPolicy};
use crate::drives::{DriveCommands, DriveDetector, HDDWipe, SSDWipe};
use crate::{DriveError, MediaType, WipeConfig, WipeOutcome, WipeReport};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

/// Counters for one monitoring session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub cycles: u64,
    pub wiped: u64,
    pub failed: u64,
    /// Vanished or unclassifiable devices
    pub skipped: u64,
}

impl SessionStats {
    fn record(&mut self, report: &WipeReport) {
        match report.outcome {
            WipeOutcome::Success => self.wiped += 1,
            WipeOutcome::ToolFailure => self.failed += 1,
            WipeOutcome::DeviceVanished | WipeOutcome::ClassificationUnknown => {
                self.skipped += 1
            }
        }
    }
}

/// Polling loop state: the known-device set and session counters
pub struct WipeOrchestrator {
    config: AutoWipeConfig,
    detector: Arc<DriveDetector>,
    commands: Arc<dyn DriveCommands>,
    known: BTreeSet<String>,
    /// False until one enumeration has succeeded; nothing is wiped before that
    seeded: bool,
    stats: SessionStats,
}

impl WipeOrchestrator {
    /// Disks attached when the orchestrator is created become known
    /// immediately and are never wiped.
    ///
    /// If the partition table cannot be read yet, the first successful
    /// enumeration seeds the known set instead and wipes nothing.
    pub fn new(config: AutoWipeConfig, commands: Arc<dyn DriveCommands>) -> Self {
        let detector = DriveDetector::from_config(&config);
        let (known, seeded) = match detector.try_enumerate() {
            Ok(known) => {
                log_startup_devices(&known);
                (known, true)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Partition table unreadable at startup, nothing will be wiped until it can be read"
                );
                (BTreeSet::new(), false)
            }
        };

        Self {
            config,
            detector: Arc::new(detector),
            commands,
            known,
            seeded,
            stats: SessionStats::default(),
        }
    }

    /// Whether the startup device set has been recorded
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    pub fn known(&self) -> &BTreeSet<String> {
        &self.known
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn detector(&self) -> &DriveDetector {
        &self.detector
    }

    /// One synchronous cycle: enumerate, diff, wipe every new device in turn.
    pub fn poll_once(&mut self) -> Vec<WipeReport> {
        let Some((current, new)) = self.scan() else {
            return Vec::new();
        };

        let mut reports = Vec::with_capacity(new.len());
        for device in new {
            let report = wipe_device(
                self.commands.as_ref(),
                &self.detector,
                &device,
                &self.config.wipe,
            );
            self.stats.record(&report);
            reports.push(report);
        }

        self.finish_cycle(current);
        reports
    }

    /// Poll until SIGINT/SIGTERM. A running wipe is always allowed to finish.
    pub async fn run(&mut self) -> SessionStats {
        let session_id = Uuid::new_v4();
        let span = tracing::info_span!("session", id = %session_id);

        async {
            tracing::info!(
                interval = %humantime::format_duration(self.config.poll_interval()),
                rediscovery = ?self.config.rediscovery,
                passes = self.config.wipe.overwrite_passes,
                "Waiting for devices"
            );

            while !crate::is_interrupted() {
                self.run_cycle().await;
                tokio::time::sleep(self.config.poll_interval()).await;
            }

            tracing::info!(
                cycles = self.stats.cycles,
                wiped = self.stats.wiped,
                failed = self.stats.failed,
                skipped = self.stats.skipped,
                "Interrupt received, stopping monitor"
            );
            self.stats.clone()
        }
        .instrument(span)
        .await
    }

    /// Same as `poll_once`, but each wipe runs on the blocking pool so the
    /// runtime stays responsive. Wipes are still awaited one at a time.
    async fn run_cycle(&mut self) {
        let Some((current, new)) = self.scan() else {
            return;
        };

        for device in new {
            let commands = Arc::clone(&self.commands);
            let detector = Arc::clone(&self.detector);
            let config = self.config.wipe.clone();
            let target = device.clone();
            let span = tracing::Span::current();

            let report = match tokio::task::spawn_blocking(move || {
                span.in_scope(|| wipe_device(commands.as_ref(), &detector, &target, &config))
            })
            .await
            {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!(device = %device, error = %e, "Wipe task aborted");
                    let mut report = WipeReport::pending(&device);
                    report.error_message = Some(e.to_string());
                    report
                }
            };
            self.stats.record(&report);
        }

        self.finish_cycle(current);
    }

    /// Current enumeration plus the devices not yet known.
    ///
    /// An unreadable partition table skips the cycle instead of reporting an
    /// empty system, which under `Forget` would make every disk look new on
    /// the next good read.
    ///
    /// Until the startup set is seeded, the first good read becomes the known
    /// set and nothing is reported as new.
    fn scan(&mut self) -> Option<(BTreeSet<String>, Vec<String>)> {
        let current = match self.detector.try_enumerate() {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!(error = %e, "Partition table unreadable, skipping cycle");
                return None;
            }
        };

        if !self.seeded {
            log_startup_devices(&current);
            self.known = current;
            self.seeded = true;
            return None;
        }

        let new: Vec<String> = current.difference(&self.known).cloned().collect();
        if !new.is_empty() {
            tracing::info!(devices = ?new, "New devices detected");
        }
        Some((current, new))
    }

    fn finish_cycle(&mut self, current: BTreeSet<String>) {
        match self.config.rediscovery {
            RediscoveryPolicy::Remember => self.known.extend(current),
            RediscoveryPolicy::Forget => {
                for gone in self.known.difference(&current) {
                    tracing::debug!(device = %gone, "Device removed, will be wiped again if reattached");
                }
                self.known = current;
            }
        }
        self.stats.cycles += 1;
    }
}

impl WipeReport {
    fn pending(device_path: &str) -> Self {
        Self {
            device_path: device_path.to_string(),
            media_type: None,
            attempts: Vec::new(),
            method: None,
            outcome: WipeOutcome::ToolFailure,
            error_message: None,
            start_time: Utc::now(),
            elapsed: Duration::ZERO,
        }
    }
}

/// Classify `device_path` and destroy its contents.
///
/// Never fails: every problem becomes the report's outcome and a log line.
pub fn wipe_device(
    commands: &dyn DriveCommands,
    detector: &DriveDetector,
    device_path: &str,
    config: &WipeConfig,
) -> WipeReport {
    let started = Instant::now();
    let mut report = WipeReport::pending(device_path);

    let media = match detector.media_type(device_path) {
        Ok(media) => media,
        Err(e) => {
            report.outcome = match e {
                DriveError::DeviceVanished(_) => WipeOutcome::DeviceVanished,
                _ => WipeOutcome::ClassificationUnknown,
            };
            report.error_message = Some(e.to_string());
            return finish(report, started);
        }
    };
    report.media_type = Some(media);

    tracing::info!(
        device = device_path,
        media = %media,
        "Got {} {}, you have been granted summary destruction",
        media,
        device_path
    );

    if let Err(e) = commands.unmount(device_path) {
        tracing::warn!(device = device_path, error = %e, "Unmount incomplete, wiping anyway");
    }

    let result = match media {
        MediaType::SolidState => SSDWipe::wipe(commands, device_path, config, &mut report.attempts),
        MediaType::Rotational => HDDWipe::wipe(commands, device_path, config, &mut report.attempts),
    };

    match result {
        Ok(method) => {
            report.method = Some(method);
            report.outcome = WipeOutcome::Success;
        }
        Err(e) => {
            report.outcome = if detector.is_present(device_path) {
                WipeOutcome::ToolFailure
            } else {
                WipeOutcome::DeviceVanished
            };
            report.error_message = Some(e.to_string());
        }
    }

    finish(report, started)
}

fn log_startup_devices(devices: &BTreeSet<String>) {
    tracing::info!(
        count = devices.len(),
        devices = ?devices,
        "Devices present at startup will not be wiped"
    );
}

fn finish(mut report: WipeReport, started: Instant) -> WipeReport {
    report.elapsed = started.elapsed();
    log_report(&report);
    report
}

fn log_report(report: &WipeReport) {
    let elapsed = humantime::format_duration(Duration::from_millis(
        report.elapsed.as_millis() as u64,
    ));
    let device = report.device_path.as_str();
    let error = report.error_message.as_deref().unwrap_or("");

    match report.outcome {
        WipeOutcome::Success => tracing::info!(
            device,
            method = %report.method.map(|m| m.to_string()).unwrap_or_default(),
            elapsed = %elapsed,
            "Wipe completed, thank you for your service"
        ),
        WipeOutcome::ToolFailure => tracing::error!(
            device,
            attempts = ?report.attempts,
            error,
            elapsed = %elapsed,
            "Wipe failed, device will not be retried this session"
        ),
        WipeOutcome::DeviceVanished => {
            tracing::warn!(device, error, "Device vanished before the wipe finished")
        }
        WipeOutcome::ClassificationUnknown => {
            tracing::warn!(device, error, "Media type unknown, device skipped")
        }
    }

    match serde_json::to_string(report) {
        Ok(json) => tracing::debug!(report = %json, "Wipe report"),
        Err(e) => tracing::debug!(error = %e, "Wipe report not serializable"),
    }
}
