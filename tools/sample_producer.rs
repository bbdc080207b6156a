//! Sample Detection Request Producer
//!
//! Generates synthetic detection requests as JSON lines on stdout, for
//! feeding the replay runner and for producing test fixtures. Logs go to
//! stderr so the data stream stays clean.

use agent_detector::types::request::{
    BehaviorEvent, BehavioralData, ClickPatterns, DeviceFingerprint, KeystrokeDynamics,
    MouseMovement, PageInteraction, ScrollBehavior, UnifiedDetectionRequest,
};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tracing::info;

const HUMAN_USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

const AGENT_USER_AGENTS: [&str; 2] = [
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) HeadlessChrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) HeadlessChrome/120.0.0.0 Safari/537.36",
];

const ACTION_TYPES: [&str; 4] = [
    "TIMED_SHORT",
    "TIMED_LONG",
    "PERIODIC_SNAPSHOT",
    "PAGE_BEFORE_UNLOAD",
];

/// Request generator with human and agent profiles
struct RequestGenerator {
    rng: StdRng,
    session_counter: u64,
}

impl RequestGenerator {
    fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            session_counter: 0,
        }
    }

    /// Generate a human-looking session: jittered timing, wandering mouse,
    /// plausible aggregates.
    fn generate_human(&mut self) -> UnifiedDetectionRequest {
        self.session_counter += 1;
        let base_ts = Utc::now().timestamp_millis() - 120_000;

        let sample_count = self.rng.gen_range(20..60);
        let mut movements = Vec::with_capacity(sample_count);
        let mut ts = base_ts;
        let mut x = self.rng.gen_range(100.0..800.0);
        let mut y = self.rng.gen_range(100.0..600.0);
        for _ in 0..sample_count {
            ts += self.rng.gen_range(15..80);
            x += self.rng.gen_range(-40.0..40.0);
            y += self.rng.gen_range(-30.0..30.0);
            let velocity = if self.rng.gen_bool(0.9) {
                Some(self.rng.gen_range(0.2..3.5))
            } else {
                None
            };
            movements.push(MouseMovement { x, y, timestamp: ts, velocity });
        }

        let mut sequence = Vec::new();
        let mut seq_ts = base_ts;
        for _ in 0..self.rng.gen_range(15..40) {
            seq_ts += self.rng.gen_range(40..900);
            let action = match self.rng.gen_range(0..10) {
                0..=4 => "mouse_move",
                5..=6 => "click",
                7 => "keystroke",
                8 => "scroll",
                _ => "TIMED_SHORT",
            };
            sequence.push(BehaviorEvent {
                action: action.to_string(),
                timestamp: seq_ts,
            });
        }

        UnifiedDetectionRequest {
            session_id: Some(format!("sess_{:08}", self.session_counter)),
            request_id: None,
            behavioral_data: BehavioralData {
                mouse_movements: movements,
                click_patterns: ClickPatterns {
                    avg_click_interval: self.rng.gen_range(180.0..600.0),
                    click_precision: self.rng.gen_range(0.55..0.95),
                    double_click_rate: self.rng.gen_range(0.0..0.15),
                },
                keystroke_dynamics: KeystrokeDynamics {
                    typing_speed_cpm: self.rng.gen_range(150.0..420.0),
                    key_hold_time_ms: self.rng.gen_range(60.0..140.0),
                    key_interval_variance: self.rng.gen_range(20.0..120.0),
                },
                scroll_behavior: ScrollBehavior {
                    scroll_speed: self.rng.gen_range(40.0..300.0),
                    scroll_acceleration: self.rng.gen_range(0.5..6.0),
                    pause_frequency: self.rng.gen_range(0.2..4.0),
                },
                page_interaction: PageInteraction {
                    session_duration_ms: self.rng.gen_range(20_000.0..180_000.0),
                    page_dwell_time_ms: self.rng.gen_range(3_000.0..30_000.0),
                    first_interaction_delay_ms: if self.rng.gen_bool(0.85) {
                        Some(self.rng.gen_range(300.0..2500.0))
                    } else {
                        None
                    },
                    form_fill_speed_cpm: if self.rng.gen_bool(0.5) {
                        Some(self.rng.gen_range(80.0..300.0))
                    } else {
                        None
                    },
                    paste_ratio: if self.rng.gen_bool(0.6) {
                        Some(self.rng.gen_range(0.0..0.3))
                    } else {
                        None
                    },
                },
            },
            behavior_sequence: Some(sequence),
            device_fingerprint: DeviceFingerprint {
                user_agent: self.random_choice(&HUMAN_USER_AGENTS).to_string(),
                http_signature_state: Some("present".to_string()),
                tls_ja4: Some(format!("t13d1516h2_{:012x}", self.rng.gen::<u64>() & 0xffff_ffff_ffff)),
                anti_fingerprint_signals: vec![],
            },
            context: Some(self.context_with_action_type()),
            persona_features: None,
        }
    }

    /// Generate an automated session: metronome timing, straight-line mouse,
    /// headless fingerprint.
    fn generate_agent(&mut self) -> UnifiedDetectionRequest {
        self.session_counter += 1;
        let base_ts = Utc::now().timestamp_millis() - 10_000;

        let sample_count = self.rng.gen_range(5..15);
        let mut movements = Vec::with_capacity(sample_count);
        let x0 = self.rng.gen_range(0.0..50.0);
        for i in 0..sample_count {
            movements.push(MouseMovement {
                x: x0 + (i as f64) * 25.0, // straight line, fixed step
                y: 300.0,
                timestamp: base_ts + (i as i64) * 50, // metronome interval
                velocity: Some(1.0),
            });
        }

        let sequence = (0..self.rng.gen_range(8..20))
            .map(|i| BehaviorEvent {
                action: "click".to_string(),
                timestamp: base_ts + (i as i64) * 50,
            })
            .collect();

        let mut signals = vec![
            "navigator_webdriver_true".to_string(),
            "headless_user_agent".to_string(),
        ];
        if self.rng.gen_bool(0.5) {
            signals.push("plugins_empty".to_string());
        }

        UnifiedDetectionRequest {
            session_id: Some(format!("sess_{:08}", self.session_counter)),
            request_id: None,
            behavioral_data: BehavioralData {
                mouse_movements: movements,
                click_patterns: ClickPatterns {
                    avg_click_interval: self.rng.gen_range(80.0..120.0),
                    click_precision: self.rng.gen_range(0.98..1.0),
                    double_click_rate: 0.0,
                },
                keystroke_dynamics: KeystrokeDynamics {
                    typing_speed_cpm: self.rng.gen_range(600.0..1200.0),
                    key_hold_time_ms: self.rng.gen_range(5.0..20.0),
                    key_interval_variance: self.rng.gen_range(0.0..5.0),
                },
                scroll_behavior: ScrollBehavior {
                    scroll_speed: 0.0,
                    scroll_acceleration: 0.0,
                    pause_frequency: 0.0,
                },
                page_interaction: PageInteraction {
                    session_duration_ms: self.rng.gen_range(2_000.0..8_000.0),
                    page_dwell_time_ms: self.rng.gen_range(200.0..1_500.0),
                    first_interaction_delay_ms: Some(self.rng.gen_range(5.0..50.0)),
                    form_fill_speed_cpm: Some(self.rng.gen_range(800.0..2000.0)),
                    paste_ratio: Some(self.rng.gen_range(0.8..1.0)),
                },
            },
            behavior_sequence: Some(sequence),
            device_fingerprint: DeviceFingerprint {
                user_agent: self.random_choice(&AGENT_USER_AGENTS).to_string(),
                http_signature_state: Some("missing".to_string()),
                tls_ja4: None,
                anti_fingerprint_signals: signals,
            },
            context: Some(self.context_with_action_type()),
            persona_features: None,
        }
    }

    fn context_with_action_type(&mut self) -> HashMap<String, serde_json::Value> {
        let action_type = self.random_choice(&ACTION_TYPES);
        let mut context = HashMap::new();
        context.insert(
            "action_type".to_string(),
            serde_json::Value::String(action_type.to_string()),
        );
        context
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

fn main() -> anyhow::Result<()> {
    // Logs to stderr; stdout carries the generated JSON lines
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Sample Detection Request Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let count: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(100);
    let agent_rate: f64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(0.1);
    let seed: Option<u64> = args.get(3).and_then(|s| s.parse().ok());

    info!(
        count = count,
        agent_rate = agent_rate,
        seeded = seed.is_some(),
        "Configuration loaded"
    );

    let mut generator = RequestGenerator::new(seed);

    let mut human_count = 0;
    let mut agent_count = 0;

    for i in 0..count {
        let request = if generator.rng.gen_bool(agent_rate) {
            agent_count += 1;
            generator.generate_agent()
        } else {
            human_count += 1;
            generator.generate_human()
        };

        println!("{}", serde_json::to_string(&request)?);

        if (i + 1) % 10 == 0 {
            info!(
                "Generated {}/{} requests ({} human, {} agent)",
                i + 1,
                count,
                human_count,
                agent_count
            );
        }
    }

    info!(
        "Completed! Generated {} requests ({} human, {} agent)",
        count, human_count, agent_count
    );

    Ok(())
}
