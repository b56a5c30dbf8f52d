use std::process;
use std::sync::Arc;

use odfdr_installer::installer::StepFailure;
use odfdr_installer::{cli, executor::RealCommandExecutor, init_logging, run_install};
use tracing::error;

fn main() {
    let args = cli::parse_args();

    if let Err(e) = init_logging(args.install.log_level) {
        eprintln!("{:#}", e);
        process::exit(1);
    }

    let executor = Arc::new(RealCommandExecutor {
        dry_run: args.install.dry_run,
    });

    if let Err(e) = run_install(&args.install, executor) {
        let failure = e.downcast_ref::<StepFailure>();
        error!(
            step = failure.map(|f| f.step),
            cluster = failure.and_then(|f| f.cluster.as_deref()),
            error = %format!("{:#}", e),
            "error provisioning cluster"
        );
        process::exit(1);
    }
}
