//! Times one lookup over a one-hot database.
//!
//! The database is either read from a CSV dataset or generated from the CLI options. It is
//! encrypted with a query matching one of its records, looked up with the selected execution
//! strategy and the decrypted answer is checked against the matching record.

use clap::Parser;
use locpir_benchmark::{
    dataset_payload_len, dataset_workload, encrypt_query, encrypt_workload, run_lookup, synthetic_workload,
    PredicateKind, Workload,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;
use tfhe::boolean::client_key::ClientKey;
use tfhe::boolean::parameters::{DEFAULT_PARAMETERS, PARAMETERS_ERROR_PROB_2_POW_MINUS_165};
use tfhe::boolean::server_key::ServerKey;
use tfhe_locpir::client::dataset::load_dataset_from_path;
use tfhe_locpir::{
    AcceleratorConfig, BitEncryptor, BooleanGates, ClearGates, Error, ExecutionConfig,
    ExecutionContext, ExecutionStrategy, GateCounter, LookupClient, LookupServer, PayloadKind,
    Result,
};

#[derive(clap::Parser, Debug, Clone)]
#[clap(long_about = "Times one private location lookup over a synthetic database.")]
pub struct Args {
    /// Toml execution configuration, overrides the strategy, threads and accelerator options
    #[clap(long, value_parser)]
    pub config: Option<String>,

    /// One of sequential, parallel-records, parallel-circuits, accelerated
    #[clap(long, value_parser, default_value_t = ExecutionStrategy::Sequential)]
    pub strategy: ExecutionStrategy,

    /// Worker threads of the CPU pool
    #[clap(long, value_parser, default_value_t = 8)]
    pub threads: usize,

    /// Lanes of the accelerator, no accelerator if not set
    #[clap(long, value_parser)]
    pub lanes: Option<usize>,

    /// CSV dataset whose columns match the predicate, replaces the synthetic records
    #[clap(long, value_parser)]
    pub database: Option<String>,

    /// Encoding of the dataset payload column, one of text, value
    #[clap(long, value_parser, default_value_t = PayloadKind::Text)]
    pub payload: PayloadKind,

    #[clap(long, value_parser, default_value_t = 16)]
    pub records: usize,

    /// Bits of a coordinate or an identifier
    #[clap(long, value_parser, default_value_t = 16)]
    pub location_bits: usize,

    /// Bits of a payload, at most 64. Text datasets use the longest text instead
    #[clap(long, value_parser, default_value_t = 32)]
    pub payload_bits: usize,

    #[clap(long, value_enum, default_value_t = PredicateKind::Area)]
    pub predicate: PredicateKind,

    /// Seed of the workload generation
    #[clap(long, value_parser)]
    pub seed: Option<u64>,

    /// Use the 2^-165 failure probability parameters instead of the default ones
    #[clap(long, value_parser)]
    pub low_failure: bool,

    /// Evaluate the circuits on clear bits, no key is generated
    #[clap(long, value_parser)]
    pub clear: bool,
}

impl Args {
    fn execution_config(&self) -> Result<ExecutionConfig> {
        if let Some(path) = self.config.as_ref() {
            let content = std::fs::read_to_string(path)
                .map_err(|err| Error::from(format!("Error: `{path}`:: {err}")))?;
            return ExecutionConfig::from_toml(&content);
        }

        let config = ExecutionConfig::new(self.strategy).with_threads(self.threads);
        Ok(match self.lanes {
            Some(lanes) => config.with_accelerator(AcceleratorConfig::new(lanes)),
            None => config,
        })
    }
}

fn time_lookup<K, G>(
    client: LookupClient<K>,
    gates: G,
    workload: &Workload,
    context: &ExecutionContext,
) -> Result<()>
where
    K: BitEncryptor + Sync,
    G: BooleanGates<Bit = K::Bit>,
    K::Bit: Send,
{
    let start = Instant::now();
    let database = encrypt_workload(&client, workload)?;
    let query = encrypt_query(&client, &workload.query)?;
    println!(" encryption -> {:?}", start.elapsed());

    let server = LookupServer::new(GateCounter::new(gates));
    let start = Instant::now();
    let answer = run_lookup(&server, workload.kind, &query, &database, context)?;
    println!(" lookup -> {:?}", start.elapsed());

    let value = client.decrypt_payload(&answer, workload.payload_kind())?;
    let expected = workload.expected_payload();
    if &value != expected {
        return Err(Error::from(format!(
            "Record {} holds {expected:?} but the lookup returned {value:?}",
            workload.expected
        )));
    }
    println!(" answer -> {value:?} (record {})", workload.expected);

    let count = server.gates().count();
    println!(
        " gates -> {} bootstrapped ({} and, {} xor, {} xnor, {} mux)",
        count.bootstrapped(),
        count.and,
        count.xor,
        count.xnor,
        count.mux
    );
    if let Some(device) = context.accelerator() {
        println!(
            " accelerator -> {} launches, {} gates ({} lanes, waves of {})",
            device.launch_count(),
            device.evaluated_gates(),
            device.config().lanes,
            device.config().wave_size
        );
    }
    Ok(())
}

pub fn main() -> Result<()> {
    let args = Args::parse();
    println!("User Options: {args:?}");

    // Register tracing subscriber that use env-filter
    // Select verbosity with env_var: e.g. `RUST_LOG=tfhe_locpir=debug`
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .with_file(false)
        .with_line_number(false)
        .without_time()
        .init();

    let mut rng: StdRng = match args.seed {
        Some(seed) => SeedableRng::seed_from_u64(seed),
        None => SeedableRng::from_entropy(),
    };

    let context = ExecutionContext::new(args.execution_config()?)?;
    let (workload, payload_bits) = match args.database.as_ref() {
        Some(path) => {
            let records = load_dataset_from_path(path, args.predicate.into(), args.payload)?;
            let payload_bits = dataset_payload_len(&records, args.payload, args.payload_bits);
            (dataset_workload(args.predicate, records, &mut rng)?, payload_bits)
        }
        None => {
            let workload = synthetic_workload(
                args.predicate,
                args.records,
                args.location_bits,
                args.payload_bits,
                &mut rng,
            )?;
            (workload, args.payload_bits)
        }
    };
    tracing::debug!(seed = ?args.seed, expected = workload.expected, "workload generated");
    println!(
        "{:?} lookup over {} records with the {} strategy on {} threads",
        workload.kind,
        workload.records.len(),
        context.strategy(),
        context.config().threads
    );

    if args.clear {
        let client = LookupClient::new(ClearGates, args.location_bits, payload_bits)?;
        return time_lookup(client, ClearGates, &workload, &context);
    }

    let parameters = if args.low_failure {
        PARAMETERS_ERROR_PROB_2_POW_MINUS_165
    } else {
        DEFAULT_PARAMETERS
    };
    let start = Instant::now();
    let cks = ClientKey::new(&parameters);
    let sks = ServerKey::new(&cks);
    println!(" key generation -> {:?}", start.elapsed());

    let client = LookupClient::new(cks, args.location_bits, payload_bits)?;
    time_lookup(client, sks, &workload, &context)
}
