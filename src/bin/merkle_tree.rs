use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use rand::RngCore;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use zkp_identity_registry::{MerkleTree, UserId};

/// Upper bound for the id list file (10MB).
const MAX_IDS_FILE_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(author, version, about = "Build a keccak Merkle allowlist over user ids", long_about = None)]
struct Args {
    /// User ids: 0x-prefixed bytes32 values or labels such as `User1`.
    #[arg(long, value_delimiter = ',')]
    ids: Vec<String>,

    /// File with one user id or label per line.
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Append this many random ids.
    #[arg(long, default_value_t = 0)]
    random: usize,

    /// Print and check the proof for this id.
    #[arg(short, long)]
    prove: Option<String>,

    /// Write the root and every proof as JSON.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct AllowlistEntry {
    user_id: UserId,
    leaf: String,
    proof: Vec<String>,
}

#[derive(Serialize)]
struct Allowlist {
    root: String,
    entries: Vec<AllowlistEntry>,
}

/// Hex input is taken as the id itself; anything else is hashed as a label.
fn parse_user_id(input: &str) -> Result<UserId> {
    let trimmed = input.trim();
    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        UserId::from_hex(trimmed)
    } else {
        Ok(UserId::from_label(trimmed))
    }
}

fn collect_ids(args: &Args) -> Result<Vec<UserId>> {
    let mut ids = args
        .ids
        .iter()
        .map(|id| parse_user_id(id))
        .collect::<Result<Vec<_>>>()?;

    if let Some(path) = &args.file {
        let metadata = fs::metadata(path)
            .with_context(|| format!("Failed to read metadata of {}", path.display()))?;
        if metadata.len() > MAX_IDS_FILE_SIZE {
            return Err(anyhow::anyhow!(
                "Id file too large: {} bytes (max {} bytes)",
                metadata.len(),
                MAX_IDS_FILE_SIZE
            ));
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let id = parse_user_id(line)
                .with_context(|| format!("Invalid user id on line {}", line_no + 1))?;
            ids.push(id);
        }
    }

    let mut rng = rand::thread_rng();
    for _ in 0..args.random {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        ids.push(UserId::new(bytes));
    }

    Ok(ids)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ids = collect_ids(&args)?;
    info!("Building Merkle tree over {} user id(s)", ids.len());

    let tree = MerkleTree::from_user_ids(&ids)?;
    println!("Merkle Root: {}", tree.root_hex());

    if let Some(target) = &args.prove {
        let id = parse_user_id(target)?;
        let proof = tree
            .proof_for_user(&id)
            .with_context(|| format!("{id} is not in the allowlist"))?;
        println!("Proof for {id}: {:?}", proof.siblings_hex());
        println!("{proof}");
        println!("Proof valid: {}", tree.verify_proof(&proof));
    }

    if let Some(path) = &args.output {
        let entries = ids
            .iter()
            .zip(0..)
            .filter_map(|(id, index)| {
                let proof = tree.generate_proof(index)?;
                Some(AllowlistEntry {
                    user_id: *id,
                    leaf: format!("0x{}", hex::encode(proof.leaf)),
                    proof: proof.siblings_hex(),
                })
            })
            .collect();
        let allowlist = Allowlist {
            root: tree.root_hex(),
            entries,
        };
        let json = serde_json::to_string_pretty(&allowlist).context("Failed to encode allowlist")?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("Allowlist written to {}", path.display());
        println!("Allowlist written to {}", path.display());
    }

    Ok(())
}
