use anyhow::{Context, Result};
use clap::Parser;
use httpcl::config::{self, ClientConfig};
use httpcl::error::new_api_error;
use httpcl::http::{BearerAuthInterceptor, HttpClient, LoggingInterceptor};
use httpcl::{Error, ErrorKind};
use reqwest::Method;
use std::sync::Arc;

/// httpcl - OAuth-aware HTTP client
///
/// Obtains access tokens from a token endpoint and performs authenticated
/// requests. Failures are reported on stderr as a JSON error object.
///
/// Examples:
///   httpcl token                                # Print an access token
///   httpcl get https://api.example.com/customers
#[derive(Parser, Debug)]
#[command(author, version = env!("HTTPCL_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Token endpoint URL [env: HTTP_CLIENT_TOKEN_ENDPOINT]
    #[arg(long, value_name = "URL", global = true)]
    token_endpoint: Option<String>,

    /// OAuth client ID [env: HTTP_CLIENT_CLIENT_ID]
    #[arg(long, value_name = "ID", global = true)]
    client_id: Option<String>,

    /// OAuth client secret [env: HTTP_CLIENT_SECRET]
    #[arg(long, value_name = "SECRET", global = true)]
    client_secret: Option<String>,

    /// Additional token request parameter, repeatable. Added on top of
    /// HTTP_CLIENT_ADD_PARAMS (k=v,k2=v2)
    #[arg(
        long = "param",
        short = 'p',
        value_name = "KEY=VALUE",
        value_parser = parse_param_arg,
        global = true
    )]
    params: Vec<(String, String)>,

    /// Overall request timeout in seconds [env: HTTP_CLIENT_TIMEOUT_SECS]
    #[arg(long, value_name = "SECS", global = true)]
    timeout: Option<u64>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Fetch an access token and print it
    Token(TokenArgs),

    /// Fetch an access token, then GET a URL with it
    Get(GetArgs),
}

#[derive(clap::Args, Debug)]
struct TokenArgs {
    /// Print the whole token response as JSON
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args, Debug)]
struct GetArgs {
    /// The URL to fetch
    #[arg(value_name = "URL")]
    url: String,
}

fn parse_param_arg(raw: &str) -> std::result::Result<(String, String), String> {
    config::parse_param(raw).map_err(|e| e.message().to_string())
}

impl Cli {
    fn client_config(&self) -> httpcl::Result<ClientConfig> {
        self.client_config_with(|key| std::env::var(key).ok())
    }

    /// Flags win over `env`; `--param` entries are layered over the
    /// environment's parameter list.
    fn client_config_with<F>(&self, env: F) -> httpcl::Result<ClientConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ClientConfig::load(|key| self.flag(key).or_else(|| env(key)))?;
        config.additional_params.extend(self.params.iter().cloned());
        Ok(config)
    }

    fn flag(&self, key: &str) -> Option<String> {
        match key {
            config::ENV_TOKEN_ENDPOINT => self.token_endpoint.clone(),
            config::ENV_CLIENT_ID => self.client_id.clone(),
            config::ENV_CLIENT_SECRET => self.client_secret.clone(),
            config::ENV_TIMEOUT_SECS => self.timeout.map(|secs| secs.to_string()),
            _ => None,
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let auth = Arc::new(BearerAuthInterceptor::unset());
    let client = HttpClient::builder(cli.client_config()?)
        .interceptor(Arc::clone(&auth))
        .interceptor(LoggingInterceptor)
        .build()?;

    match cli.command {
        Commands::Token(args) => {
            let token = client.fetch_token().await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&token)?);
            } else {
                println!("{}", token.access_token());
            }
        }
        Commands::Get(args) => {
            let token = client.fetch_token().await?;
            if token.access_token().is_empty() {
                return Err(Error::msg(
                    ErrorKind::Authentication,
                    "Token endpoint returned no access token",
                )
                .into());
            }
            auth.set_token(token.access_token())?;

            let request = client
                .request(Method::GET, &args.url)
                .build()
                .map_err(|e| {
                    Error::new(
                        ErrorKind::InvalidInput,
                        format!("Invalid URL: {}", args.url),
                        Some(e),
                    )
                })?;
            let response = client.do_request(request).await?;

            let status = response.status();
            let body = response
                .text()
                .await
                .context("Failed to read response body")?;

            if !status.is_success() {
                return Err(Error::msg(
                    ErrorKind::from_status(status),
                    format!("GET {} returned status {}", args.url, status.as_u16()),
                )
                .with_context_entry("status", status.as_u16())
                .with_context_entry("body", body)
                .into());
            }

            println!("{}", body);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        let (api_error, _) = new_api_error(&*err);
        match serde_json::to_string_pretty(&api_error.to_response()) {
            Ok(json) => eprintln!("{}", json),
            Err(_) => eprintln!("{}", api_error),
        }
        std::process::exit(1);
    }
}
