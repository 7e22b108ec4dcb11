use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shared::config::load_dotenv;
use shared::{Config, HeadlineSource, Publisher, TextGenerator};
use std::env;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const SAMPLE_HEADLINES: &str = "1. Senate announces new climate initiative worth $50 billion
2. Stock market reaches record high as tech stocks surge
3. Supreme Court to hear major case on social media regulation
4. Unemployment rate drops to lowest level in 50 years
5. NASA announces plans for crewed Mars mission";

#[derive(Parser)]
#[command(name = "check-setup")]
#[command(about = "Diagnostics for the headline poster: environment, services and credentials")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check which environment variables are set, without printing secrets
    Env,
    /// Fetch headlines and print them
    News,
    /// Generate a sample post and its topics from fixed headlines
    Generate,
    /// Check configuration, platform credentials and the headline source
    Validate,
}

struct EnvCheck {
    name: &'static str,
    secret: bool,
    required: bool,
}

const ENV_CHECKS: [EnvCheck; 8] = [
    EnvCheck { name: "APP_ENV", secret: false, required: false },
    EnvCheck { name: "DRY_RUN", secret: false, required: false },
    EnvCheck { name: "OPENAI_API_KEY", secret: true, required: true },
    EnvCheck { name: "TWITTER_API_KEY", secret: true, required: true },
    EnvCheck { name: "TWITTER_API_SECRET", secret: true, required: true },
    EnvCheck { name: "TWITTER_ACCESS_TOKEN", secret: true, required: true },
    EnvCheck { name: "TWITTER_ACCESS_SECRET", secret: true, required: true },
    EnvCheck { name: "NEWS_API_KEY", secret: true, required: false },
];

fn mask_secret(value: Option<&str>) -> String {
    match value {
        None => "❌ NOT SET".to_string(),
        Some(v) if v.len() < 10 => "❌ TOO SHORT (invalid)".to_string(),
        Some(v) => {
            let prefix: String = v.chars().take(8).collect();
            format!("✅ SET ({} chars, starts with: {}...)", v.len(), prefix)
        }
    }
}

fn check_env() -> bool {
    println!("=== Environment Variables Check ===\n");

    let mut ok = true;
    for check in &ENV_CHECKS {
        let value = env::var(check.name).ok().filter(|v| !v.is_empty());
        let valid = match &value {
            Some(v) => !check.secret || v.len() >= 10,
            None => false,
        };

        let display = if check.secret {
            mask_secret(value.as_deref())
        } else {
            value.clone().unwrap_or_else(|| "not set".to_string())
        };

        println!("{} {}: {}", if valid { "✅" } else { "❌" }, check.name, display);

        if !valid && check.required {
            ok = false;
        }
    }

    println!("\n=== Summary ===");
    if ok {
        println!("✅ All required environment variables are set!");
    } else {
        println!("❌ Some required environment variables are missing or invalid!");
    }
    ok
}

async fn test_news() -> Result<()> {
    println!("📰 Fetching headlines...");
    let source = HeadlineSource::new(env::var("NEWS_API_KEY").ok().filter(|v| !v.is_empty()))?;

    let headlines = source.get_headlines().await?;
    println!("✓ Fetched {} headlines:", headlines.len());
    for (i, headline) in headlines.iter().enumerate() {
        println!("  {}. {}", i + 1, headline);
    }

    // Served from the cache, no second request
    let formatted = source.get_formatted_headlines().await?;
    println!("\nFormatted prompt input:\n{}", formatted);
    Ok(())
}

async fn test_generate() -> Result<()> {
    let api_key = env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is required")?;
    let mut generator = TextGenerator::new(api_key)?;
    if let Ok(model) = env::var("OPENAI_MODEL") {
        generator = generator.with_model(model);
    }

    println!("🤖 Generating a post from sample headlines...");
    let post = generator.generate_post(SAMPLE_HEADLINES).await?;
    println!("\n--- Generated Post ---\n{}", post);
    println!("--- Length: {}/280 ---\n", post.chars().count());

    println!("🔖 Extracting topics...");
    let topics = generator.extract_topics(&post).await;
    for (i, topic) in topics.iter().enumerate() {
        println!("  {}. {}", i + 1, topic);
    }
    Ok(())
}

async fn validate() -> bool {
    println!("=== Validating setup ===\n");
    let mut ok = true;

    println!("Step 1: Checking configuration...");
    let config = match Config::from_env() {
        Ok(config) => {
            println!(
                "✓ Configuration loaded (env: {}, dry run: {}, news API key: {})",
                config.app_env,
                config.dry_run,
                config.news_api_key.is_some()
            );
            Some(config)
        }
        Err(e) => {
            println!("✗ Configuration failed: {}", e);
            None
        }
    };
    let Some(config) = config else {
        return false;
    };

    println!("\nStep 2: Validating Twitter credentials...");
    match Publisher::new(config.twitter.clone(), true) {
        Ok(publisher) => {
            if publisher.verify_credentials().await {
                println!("✓ Twitter credentials verified");
            } else {
                println!("✗ Twitter credentials invalid");
                ok = false;
            }
        }
        Err(e) => {
            println!("✗ Twitter verification failed: {}", e);
            ok = false;
        }
    }

    println!("\nStep 3: Testing news service...");
    let fetched = match HeadlineSource::new(config.news_api_key.clone()) {
        Ok(source) => source.get_headlines().await,
        Err(e) => Err(e),
    };
    match fetched {
        Ok(headlines) => println!("✓ News service working ({} headlines)", headlines.len()),
        Err(e) => {
            println!("✗ News service failed: {}", e);
            ok = false;
        }
    }

    println!("\nStep 4: Checking OpenAI configuration...");
    if config.openai_api_key.starts_with("sk-") {
        println!("✓ OpenAI API key configured (format looks correct)");
    } else {
        println!("✗ OpenAI API key has an unexpected format");
        ok = false;
    }

    println!("\n=== Validation Complete ===");
    if ok {
        println!("✅ All checks passed - the bot is ready to run!");
        println!("\nNext steps:");
        println!("  1. Test locally: post-tweet --dry-run");
        println!("  2. Schedule post-tweet with the credentials as secrets");
    } else {
        println!("❌ Setup validation failed - please fix the errors above");
    }
    ok
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    std::panic::set_hook(Box::new(|info| {
        tracing::error!(panic = %info, "Unhandled panic");
        std::process::exit(1);
    }));

    let args = Args::parse();
    load_dotenv();

    let ok = match args.command {
        Command::Env => check_env(),
        Command::News => report(test_news().await, "News service"),
        Command::Generate => report(test_generate().await, "Text generation"),
        Command::Validate => validate().await,
    };

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn report(result: Result<()>, what: &str) -> bool {
    match result {
        Ok(()) => {
            println!("\n✅ {} test passed", what);
            true
        }
        Err(e) => {
            eprintln!("\n❌ {} test failed: {:#}", what, e);
            false
        }
    }
}
