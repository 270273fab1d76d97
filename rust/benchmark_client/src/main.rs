use anyhow::{Context, Result};
use common::{BenchmarkConfig, PredictRequest, PredictResponse, ScenarioConfig, Statistics};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use sysinfo::{ProcessRefreshKind, RefreshKind, System};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScenarioResult {
    scenario_name: String,
    concurrency: usize,
    num_requests: usize,
    latency_ms: Statistics,
    price: Statistics,
    confidence: Statistics,
    throughput_qps: f64,
    total_duration_sec: f64,
    cpu_percent: f32,
    memory_rss_mb: f64,
    errors: usize,
    error_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BenchmarkReport {
    server_url: String,
    server_info: serde_json::Value,
    results: HashMap<String, ScenarioResult>,
    timestamp: String,
}

/// Latency, price and confidence of one successful call.
struct Sample {
    latency_ms: f64,
    price: f64,
    confidence: f64,
}

struct BenchmarkClient {
    server_url: String,
    client: reqwest::blocking::Client,
}

impl BenchmarkClient {
    fn new(server_url: String) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { server_url, client })
    }

    fn wait_for_server(&self, timeout_secs: u64) -> Result<()> {
        let health_url = format!("{}/health", self.server_url);
        let start = Instant::now();

        println!("Waiting for server at {}...", self.server_url);

        while start.elapsed().as_secs() < timeout_secs {
            if let Ok(response) = self.client.get(&health_url).send() {
                if response.status().is_success() {
                    let health: serde_json::Value = response.json()?;
                    if health["model_loaded"] == serde_json::Value::Bool(false) {
                        println!("⚠ Server is up but has no model; predictions will fail");
                    } else {
                        println!("✓ Server is ready!");
                    }
                    return Ok(());
                }
            }
            std::thread::sleep(Duration::from_secs(2));
        }

        anyhow::bail!("✗ Server failed to start within {}s", timeout_secs)
    }

    fn get_server_info(&self) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(format!("{}/info", self.server_url))
            .send()
            .context("Failed to get server info")?;

        let info: serde_json::Value = response.json()?;
        Ok(info)
    }

    fn predict(&self, payload: &PredictRequest) -> Result<PredictResponse> {
        let response = self
            .client
            .post(format!("{}/predict", self.server_url))
            .json(payload)
            .send()
            .context("Failed to send predict request")?;

        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().unwrap_or_default();
            anyhow::bail!("Server returned {}: {}", status, body["error"]);
        }

        Ok(response.json()?)
    }

    fn warmup(&self, num_iterations: usize, payloads: &[PredictRequest]) -> Result<()> {
        println!("\nWarming up server ({} iterations)...", num_iterations);

        let pb = ProgressBar::new(num_iterations as u64);
        pb.set_style(progress_style("{msg} [{bar:40.cyan/blue}] {pos}/{len}")?);
        pb.set_message("Warmup");

        let mut last_error = None;
        let mut errors = 0;

        for payload in payloads.iter().cycle().take(num_iterations) {
            if let Err(err) = self.predict(payload) {
                errors += 1;
                last_error = Some(err);
            }
            pb.inc(1);
        }

        pb.finish_with_message("✓ Warmup complete");

        if let Some(err) = last_error {
            println!(
                "⚠ Warning: {}/{} warmup requests failed (last error: {:#})",
                errors, num_iterations, err
            );
        }

        Ok(())
    }

    fn run_scenario(
        &self,
        scenario: &ScenarioConfig,
        payloads: &[PredictRequest],
    ) -> Result<ScenarioResult> {
        println!("\n{}", "=".repeat(70));
        println!("Scenario: {}", scenario.name);
        if !scenario.description.is_empty() {
            println!("  {}", scenario.description);
        }
        println!("  Concurrency: {}", scenario.concurrency);
        println!("  Requests: {}", scenario.num_requests);
        println!("{}", "=".repeat(70));

        let requests: Vec<&PredictRequest> = payloads
            .iter()
            .cycle()
            .take(scenario.num_requests)
            .collect();

        let errors = AtomicUsize::new(0);
        let samples = Mutex::new(Vec::with_capacity(scenario.num_requests));

        let pb = ProgressBar::new(scenario.num_requests as u64);
        pb.set_style(progress_style("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?);
        pb.set_message("Running");

        let start_time = Instant::now();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(scenario.concurrency.max(1))
            .build()?;

        pool.install(|| {
            requests.par_iter().for_each(|payload| {
                let request_start = Instant::now();

                match self.predict(payload) {
                    Ok(response) => {
                        let sample = Sample {
                            latency_ms: request_start.elapsed().as_secs_f64() * 1000.0,
                            price: response.price,
                            confidence: response.confidence,
                        };
                        if let Ok(mut samples) = samples.lock() {
                            samples.push(sample);
                        }
                    }
                    Err(_) => {
                        errors.fetch_add(1, Ordering::SeqCst);
                    }
                }

                pb.inc(1);
            });
        });

        let total_duration = start_time.elapsed().as_secs_f64();
        pb.finish_with_message("✓ Complete");

        let samples = samples
            .into_inner()
            .map_err(|_| anyhow::anyhow!("Sample buffer poisoned"))?;
        let column = |f: fn(&Sample) -> f64| samples.iter().map(f).collect::<Vec<f64>>();

        let error_count = errors.load(Ordering::SeqCst);
        let successful_requests = scenario.num_requests.saturating_sub(error_count);
        let (cpu_percent, memory_rss_mb) = client_process_usage();

        let result = ScenarioResult {
            scenario_name: scenario.name.clone(),
            concurrency: scenario.concurrency,
            num_requests: scenario.num_requests,
            latency_ms: Statistics::from_samples(&column(|s| s.latency_ms)),
            price: Statistics::from_samples(&column(|s| s.price)),
            confidence: Statistics::from_samples(&column(|s| s.confidence)),
            throughput_qps: successful_requests as f64 / total_duration,
            total_duration_sec: total_duration,
            cpu_percent,
            memory_rss_mb,
            errors: error_count,
            error_rate: error_count as f64 / scenario.num_requests.max(1) as f64,
        };

        println!("\nResults:");
        println!("  Total duration: {:.2}s", result.total_duration_sec);
        println!("  Throughput: {:.2} req/s", result.throughput_qps);
        println!("  Latency (mean): {:.2}ms", result.latency_ms.mean);
        println!("  Latency (p50): {:.2}ms", result.latency_ms.median);
        println!("  Latency (p95): {:.2}ms", result.latency_ms.p95);
        println!("  Latency (p99): {:.2}ms", result.latency_ms.p99);
        println!("  Price (mean): {:.2}", result.price.mean);
        println!("  Errors: {}", result.errors);
        println!("  Error rate: {:.2}%", result.error_rate * 100.0);
        if !result.confidence.within(70.0, 90.0) {
            println!(
                "⚠ Confidence outside [70, 90]: min {} max {}",
                result.confidence.min, result.confidence.max
            );
        }

        Ok(result)
    }

    fn run_benchmark(&self, config: &BenchmarkConfig) -> Result<BenchmarkReport> {
        let server_info = self.get_server_info()?;
        println!("\nServer Info:");
        println!("{}", serde_json::to_string_pretty(&server_info)?);

        let payloads = if config.payloads.is_empty() {
            default_payloads()
        } else {
            config.payloads.clone()
        };

        if config.warmup.enabled {
            self.warmup(config.warmup.num_requests, &payloads)?;
        }

        let mut results = HashMap::new();

        for scenario in &config.scenarios {
            let result = self.run_scenario(scenario, &payloads)?;
            results.insert(scenario.name.clone(), result);
        }

        Ok(BenchmarkReport {
            server_url: self.server_url.clone(),
            server_info,
            results,
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
    }
}

fn progress_style(template: &str) -> Result<ProgressStyle> {
    Ok(ProgressStyle::default_bar()
        .template(template)?
        .progress_chars("=>-"))
}

fn client_process_usage() -> (f32, f64) {
    let mut sys = System::new_with_specifics(
        RefreshKind::new().with_processes(ProcessRefreshKind::everything()),
    );
    sys.refresh_all();

    sysinfo::get_current_pid()
        .ok()
        .and_then(|pid| sys.process(pid))
        .map(|process| (process.cpu_usage(), process.memory() as f64 / 1024.0 / 1024.0))
        .unwrap_or((0.0, 0.0))
}

/// Spread of sizes and distances over a few categories, one of them unseen.
fn default_payloads() -> Vec<PredictRequest> {
    let locations = ["Downtown", "Suburb", "Rural", "Atlantis"];
    let amenities = ["Park", "School", "Hospital"];
    let zoning = ["Residential", "Commercial", "Agricultural"];

    (0..48)
        .map(|i| PredictRequest {
            size_sqm: Some(40.0 + 10.0 * i as f64),
            distance_km: Some(0.5 * (i % 20) as f64),
            location: Some(locations[i % locations.len()].to_string()),
            nearby_amenities: Some(amenities[i % amenities.len()].to_string()),
            zoning_land_type: Some(zoning[i % zoning.len()].to_string()),
        })
        .collect()
}

fn main() -> Result<()> {
    println!("========================================================================");
    println!("Property Price Benchmark Client");
    println!("========================================================================");

    let server_url =
        env::var("SERVER_URL").unwrap_or_else(|_| "http://localhost:10000".to_string());
    let config_path = PathBuf::from(
        env::var("BENCHMARK_CONFIG").unwrap_or_else(|_| "config/benchmark.yaml".to_string()),
    );
    let output_dir =
        PathBuf::from(env::var("RESULTS_DIR").unwrap_or_else(|_| "results".to_string()));

    println!("Server URL: {}", server_url);
    println!("Config: {}", config_path.display());

    let config = BenchmarkConfig::load(&config_path)
        .context("Failed to load benchmark configuration")?;

    let client = BenchmarkClient::new(server_url)?;

    client.wait_for_server(120)?;

    let report = client.run_benchmark(&config)?;

    fs::create_dir_all(&output_dir)?;

    let output_path = output_dir.join(format!(
        "predict-{}.json",
        chrono::Utc::now().format("%Y%m%dT%H%M%SZ")
    ));
    let json = serde_json::to_string_pretty(&report)?;
    fs::write(&output_path, json)?;

    println!("\n========================================================================");
    println!("Benchmark complete!");
    println!("Results saved to: {}", output_path.display());
    println!("========================================================================");

    Ok(())
}
