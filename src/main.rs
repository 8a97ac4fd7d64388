use log::{error, info, warn};

use quaternary_cp::{
    context::{Data, LocalVariableMap},
    instructions::QuaternaryInstruction,
    matrix::{MatrixBlock, RandomSpec},
    CpuKernel, ExecutionContext, QuaternaryError, RuntimeConfig,
};

// Operand shapes used when seeding the variable map: X/W are ROWS x COLS,
// U is ROWS x RANK and V is COLS x RANK. Only operands the instruction
// actually acquires are seeded
const ROWS: usize = 6;
const COLS: usize = 5;
const RANK: usize = 2;
const SEED: u64 = 727;

const DEMO_PROGRAM: [&str; 5] = [
    "wsloss,X,U,V,W,loss,POST,1",
    "wdivmm,W,U,V,X,grad,MULT_MINUS_RIGHT,2",
    "wsigmoid,W,U,V,sig,LOG,2",
    "wcemm,X,U,V,ce,BASIC,1",
    "wumm,exp,X,U,V,um,MULT,2",
];

fn seed_operands(vars: &mut LocalVariableMap, inst: &QuaternaryInstruction, seed: &mut u64) -> Result<(), QuaternaryError> {
    let shapes = [(ROWS, COLS), (ROWS, RANK), (COLS, RANK), (ROWS, COLS)];

    for (operand, (rows, cols)) in inst.acquired_inputs().into_iter().zip(shapes) {
        if vars.contains(operand.name()) {
            continue;
        }
        *seed += 1;
        let spec = RandomSpec { min: 0.1, max: 1.0, sparsity: 0.8, seed: Some(*seed) };
        vars.set_matrix_output(operand.name(), MatrixBlock::random(rows, cols, &spec))?;
    }
    Ok(())
}

fn main() -> Result<(), QuaternaryError> {
    // Initialize the logger. Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let program: Vec<String> = if args.is_empty() {
        warn!("No instructions given, running the built-in demo program");
        DEMO_PROGRAM.iter().map(|s| s.to_string()).collect()
    } else {
        args
    };

    let config = RuntimeConfig::default();
    info!("Using {} default thread(s)", config.default_threads);

    let kernel = CpuKernel::new(config.clone());
    let mut vars = LocalVariableMap::from_config(&config);
    let mut seed = SEED;

    for line in &program {
        let inst = match QuaternaryInstruction::parse_instruction_with(line, &config.format) {
            Ok(inst) => inst,
            Err(e) => {
                error!("{}", e);
                return Err(e);
            }
        };

        seed_operands(&mut vars, &inst, &mut seed)?;
        inst.process_instruction(&mut vars, &kernel)?;

        let name = inst.output().name();
        match vars.get(name) {
            Some(Data::Scalar(value)) => println!("{} = {}", name, value),
            Some(Data::Matrix(block)) => println!("{} =\n{}", name, block),
            None => warn!("{} produced no binding for {}", inst, name),
        }
    }

    info!("Variable map holds {} variable(s), {} bytes", vars.len(), vars.memory_used());
    Ok(())
}
