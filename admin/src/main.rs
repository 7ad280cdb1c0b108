use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use sales_api::services::auth::keys::{generate_rsa_pem, parse_algorithm};
use sales_api::services::auth::{
    Authenticator, Claims, KeyRegistry, MemoryKeyResolver, PrivateKey, ROLE_ADMIN, ROLE_USER,
};

/// Operator tooling for the sales API.
///
/// - keygen: write a new RSA keypair named after its key id
/// - tokengen: sign a token with an existing private key
#[derive(Parser, Debug)]
#[command(name = "sales-admin", version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an RSA keypair as `<kid>.pem` and `<kid>.pub.pem`
    Keygen {
        /// Directory the key files are written to
        #[arg(long, value_name = "DIR", default_value = "keys")]
        out_dir: PathBuf,

        /// Key id. Default: random UUID v4.
        #[arg(long)]
        kid: Option<String>,

        /// RSA modulus size
        #[arg(long, default_value_t = 2048)]
        bits: u32,
    },

    /// Mint a token signed by the private key in `--private-pem`
    Tokengen {
        #[arg(long, value_name = "FILE")]
        private_pem: PathBuf,

        /// Key id written to the token header; must match the key the API loads
        #[arg(long)]
        kid: String,

        #[arg(long)]
        subject: String,

        #[arg(long, default_value = "service project")]
        issuer: String,

        #[arg(long, default_value = "students")]
        audience: String,

        /// Comma separated, e.g. ADMIN,USER
        #[arg(long, value_delimiter = ',', default_values_t = [ROLE_ADMIN.to_string()])]
        roles: Vec<String>,

        #[arg(long, default_value_t = 8760)]
        ttl_hours: u64,

        #[arg(long, default_value = "RS256")]
        algorithm: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Keygen { out_dir, kid, bits } => keygen(out_dir, kid, bits),
        Command::Tokengen {
            private_pem,
            kid,
            subject,
            issuer,
            audience,
            roles,
            ttl_hours,
            algorithm,
        } => {
            for role in &roles {
                if role != ROLE_ADMIN && role != ROLE_USER {
                    eprintln!("warning: role {role} is not one of {ROLE_ADMIN}, {ROLE_USER}");
                }
            }
            let claims = Claims::new(
                issuer,
                subject,
                audience,
                roles,
                Duration::from_secs(ttl_hours.saturating_mul(3600)),
            );
            tokengen(&private_pem, &kid, &algorithm, &claims)
        }
    }
}

fn keygen(out_dir: PathBuf, kid: Option<String>, bits: u32) -> Result<()> {
    if bits < 2048 {
        bail!("refusing to generate an RSA key smaller than 2048 bits");
    }

    let kid = kid.unwrap_or_else(|| Uuid::new_v4().to_string());
    let (private_pem, public_pem) = generate_rsa_pem(bits).context("generating RSA keypair")?;

    fs::create_dir_all(&out_dir).with_context(|| format!("creating {}", out_dir.display()))?;

    let private_path = out_dir.join(format!("{kid}.pem"));
    let public_path = out_dir.join(format!("{kid}.pub.pem"));
    if private_path.exists() {
        bail!("{} already exists", private_path.display());
    }

    fs::write(&private_path, &private_pem)
        .with_context(|| format!("writing {}", private_path.display()))?;
    fs::write(&public_path, &public_pem)
        .with_context(|| format!("writing {}", public_path.display()))?;

    println!("kid: {kid}");
    println!("private key: {}", private_path.display());
    println!("public key: {}", public_path.display());
    Ok(())
}

fn tokengen(private_pem: &Path, kid: &str, algorithm: &str, claims: &Claims) -> Result<()> {
    let pem = fs::read(private_pem).with_context(|| format!("reading {}", private_pem.display()))?;

    let alg = parse_algorithm(algorithm)?;
    let key = PrivateKey::from_pem(alg, &pem).context("parsing private key")?;

    // Signing never touches the resolver.
    let auth = Authenticator::new(algorithm, Arc::new(MemoryKeyResolver::new()), KeyRegistry::new())?;
    auth.add_key(kid, key);

    let token = auth.generate_token(kid, claims)?;

    println!("-----BEGIN TOKEN-----");
    println!("{token}");
    println!("-----END TOKEN-----");
    Ok(())
}
