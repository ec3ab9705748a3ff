use anyhow::Context;
use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use tplc_conf::Settings;
use tplc_templates::CompileError;
use tplc_templates::CompileReport;
use tplc_templates::Compiler;

use crate::args::Args;
use crate::commands::Command;
use crate::exit::Exit;

#[derive(Debug, Parser)]
pub struct Compile {
    /// Template names, relative to the view roots (e.g. `shop/list.html`).
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    templates: Vec<String>,

    /// Compile every template under the project's own view directory.
    #[arg(long)]
    all: bool,

    /// Project root holding `app/`, `plugins/`, `system/` and the config files.
    #[arg(long, default_value = ".")]
    project: Utf8PathBuf,

    /// Fail on deprecated constructs instead of warning about them.
    #[arg(long)]
    strict: bool,
}

impl Command for Compile {
    fn execute(&self, args: &Args) -> Result<Exit> {
        let project = self
            .project
            .canonicalize_utf8()
            .with_context(|| format!("project root {} not found", self.project))?;

        let mut settings = Settings::new(&project)
            .with_context(|| format!("failed to load settings for {project}"))?;
        if self.strict {
            settings.debug = true;
        }
        if args.global.verbose > 1 {
            settings.verbose = true;
        }

        tracing::debug!(%project, ?settings, "compiling project");
        let compiler = Compiler::new(&settings, &project);
        let result = if self.all {
            compiler.compile_all()
        } else {
            self.templates
                .iter()
                .map(|template| compiler.compile(template))
                .collect::<Result<Vec<_>, _>>()
        };

        match result {
            Ok(reports) => {
                if !args.global.quiet {
                    for report in &reports {
                        print_report(report);
                    }
                }
                Ok(Exit::success())
            }
            Err(err) => Ok(Exit::error().with_message(describe(&err))),
        }
    }
}

fn print_report(report: &CompileReport) {
    println!("{} -> {}", report.template, report.artifact);
    for warning in &report.warnings {
        println!("  warning: {warning}");
    }
}

/// `error[C101]: message`. Messages already carry their location.
fn describe(err: &CompileError) -> String {
    format!("error[{}]: {err}", err.code())
}
