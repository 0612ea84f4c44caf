//! Random client identities for HTTP-style lines.

use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::net::Ipv4Addr;

/// User agent used when no browsers or systems are configured.
pub const FALLBACK_USER_AGENT: &str =
    "Mozilla/5.0 (Unknown) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124";

/// Pre-generated user agent strings, built once per formatter.
///
/// # Example
///
/// ```rust
/// use logspout::UserAgentPool;
/// use rand::SeedableRng;
///
/// let mut rng = rand::rngs::SmallRng::seed_from_u64(1);
/// let pool = UserAgentPool::new(
///     &["Firefox".to_string()],
///     &["X11; Linux x86_64".to_string()],
///     10,
///     &mut rng,
/// );
/// assert_eq!(pool.len(), 10);
/// assert!(pool.pick(&mut rng).contains("Firefox/"));
/// ```
#[derive(Debug, Clone)]
pub struct UserAgentPool {
    agents: Vec<String>,
}

impl UserAgentPool {
    /// Generates `size` agents from the given browser and system names.
    ///
    /// With either list empty the pool holds only [`FALLBACK_USER_AGENT`].
    pub fn new(browsers: &[String], systems: &[String], size: usize, rng: &mut SmallRng) -> Self {
        let agents = match (browsers.is_empty(), systems.is_empty()) {
            (false, false) => (0..size.max(1))
                .map(|_| generate(browsers, systems, rng))
                .collect(),
            _ => vec![FALLBACK_USER_AGENT.to_string()],
        };
        Self { agents }
    }

    /// Picks one agent uniformly.
    pub fn pick<'a>(&'a self, rng: &mut SmallRng) -> &'a str {
        self.agents
            .choose(rng)
            .map(String::as_str)
            .unwrap_or(FALLBACK_USER_AGENT)
    }

    /// Number of distinct slots in the pool.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Never true; the pool always holds at least the fallback agent.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

fn generate(browsers: &[String], systems: &[String], rng: &mut SmallRng) -> String {
    let browser = browsers.choose(rng).map(String::as_str).unwrap_or("Chrome");
    let system = systems.choose(rng).map(String::as_str).unwrap_or("Unknown");
    format!(
        "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) {}",
        system,
        browser_version(browser, rng)
    )
}

fn browser_version(browser: &str, rng: &mut SmallRng) -> String {
    match browser {
        "Firefox" => format!("Firefox/{}.0", rng.random_range(70..=100)),
        "Safari" => format!("Safari/{}.1.15", rng.random_range(605..=610)),
        "Edge" => format!(
            "Edg/{}.0.{}.59",
            rng.random_range(80..=100),
            rng.random_range(800..=900)
        ),
        "Opera" => format!(
            "Opera/{}.0.{}.80",
            rng.random_range(60..=70),
            rng.random_range(3000..=4000)
        ),
        "Brave" => format!(
            "Brave Chrome/{}.0.{}.124",
            rng.random_range(70..=100),
            rng.random_range(3000..=4000)
        ),
        // Chrome, and anything unrecognised
        _ => format!(
            "Chrome/{}.0.{}.124",
            rng.random_range(70..=100),
            rng.random_range(3000..=4000)
        ),
    }
}

/// Uniformly random IPv4 address.
#[inline]
pub fn random_ipv4(rng: &mut SmallRng) -> Ipv4Addr {
    Ipv4Addr::from(rng.random::<u32>())
}
