use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Classes of simulated remote calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Login,
    Register,
    Profile,
    Fetch,
    Mutate,
    Barcode,
    Image,
}

/// Simulated round-trip time per operation class, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyConfig {
    #[serde(default = "default_login_ms")]
    pub login_ms: u64,
    #[serde(default = "default_register_ms")]
    pub register_ms: u64,
    #[serde(default = "default_login_ms")]
    pub profile_ms: u64,
    #[serde(default = "default_login_ms")]
    pub fetch_ms: u64,
    #[serde(default = "default_login_ms")]
    pub mutate_ms: u64,
    #[serde(default = "default_barcode_ms")]
    pub barcode_ms: u64,
    #[serde(default = "default_image_ms")]
    pub image_ms: u64,
}

fn default_login_ms() -> u64 {
    800
}

fn default_register_ms() -> u64 {
    1000
}

fn default_barcode_ms() -> u64 {
    1200
}

fn default_image_ms() -> u64 {
    2000
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            login_ms: 800,
            register_ms: 1000,
            profile_ms: 800,
            fetch_ms: 800,
            mutate_ms: 800,
            barcode_ms: 1200,
            image_ms: 2000,
        }
    }
}

/// Delay seam standing in for network latency.
///
/// Stores await [`Latency::simulate`] before touching the catalog. Tests use
/// [`Latency::none`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Latency {
    login: Duration,
    register: Duration,
    profile: Duration,
    fetch: Duration,
    mutate: Duration,
    barcode: Duration,
    image: Duration,
}

impl Latency {
    pub fn none() -> Self {
        Self::uniform(Duration::ZERO)
    }

    pub fn uniform(d: Duration) -> Self {
        Self {
            login: d,
            register: d,
            profile: d,
            fetch: d,
            mutate: d,
            barcode: d,
            image: d,
        }
    }

    pub fn from_config(config: &LatencyConfig) -> Self {
        Self {
            login: Duration::from_millis(config.login_ms),
            register: Duration::from_millis(config.register_ms),
            profile: Duration::from_millis(config.profile_ms),
            fetch: Duration::from_millis(config.fetch_ms),
            mutate: Duration::from_millis(config.mutate_ms),
            barcode: Duration::from_millis(config.barcode_ms),
            image: Duration::from_millis(config.image_ms),
        }
    }

    pub fn duration(&self, op: Operation) -> Duration {
        match op {
            Operation::Login => self.login,
            Operation::Register => self.register,
            Operation::Profile => self.profile,
            Operation::Fetch => self.fetch,
            Operation::Mutate => self.mutate,
            Operation::Barcode => self.barcode,
            Operation::Image => self.image,
        }
    }

    pub async fn simulate(&self, op: Operation) {
        let d = self.duration(op);
        if !d.is_zero() {
            tracing::trace!(?op, ms = d.as_millis() as u64, "simulating latency");
            tokio::time::sleep(d).await;
        }
    }
}

impl Default for Latency {
    fn default() -> Self {
        Self::from_config(&LatencyConfig::default())
    }
}
