use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clinical_claim_check::{Config, Evaluator, GenerationBackend, OpenAiBackend, ScriptedBackend};

const DEMO_QUESTION: &str = "Patient has cough and runny nose, no asthma history. \
                             What is the likely diagnosis and treatment?";

/// Canned replies used when no API key is configured, so the demo still
/// exercises the whole pipeline offline: one initial answer plus one repair
/// in case the rule base rejects it.
fn offline_backend() -> ScriptedBackend {
    ScriptedBackend::new([
        r#"{
            "diagnosis": "common_cold",
            "explanation": "Cough with a runny nose and no fever points to a common cold.",
            "recommended_treatments": ["paracetamol"],
            "evidence_symptoms": ["cough", "runny nose"]
        }"#,
        r#"{
            "diagnosis": "common_cold",
            "explanation": "Cough with a runny nose and no fever points to a common cold.",
            "recommended_treatments": ["paracetamol"],
            "evidence_symptoms": ["cough", "runny nose"]
        }"#,
    ])
}

#[tokio::main]
async fn main() {
    // Load .env file if present (ignore if missing)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    let backend: Arc<dyn GenerationBackend> = match OpenAiBackend::from_env() {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            tracing::warn!(error = %e, "Running with scripted demo replies");
            Arc::new(offline_backend())
        }
    };

    let mut evaluator = match Evaluator::from_config(config, backend) {
        Ok(evaluator) => evaluator,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    match evaluator.run(DEMO_QUESTION).await {
        Ok(state) => {
            println!("{}", state.final_text.unwrap_or_default());
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
