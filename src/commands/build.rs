//! Full pipeline: compile, package and flash a sketch

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use inoflash_core::{FsImagePlan, MergeArtifacts, MergeLayout};
use inoflash_tools::{
    detect_port, format_offset, ArduinoCli, CommandRunner, DryRunRunner, Esptool, Mkspiffs,
    PortEnumerator, ProcessRunner, Result, RunLog, SystemPorts, ToolCommand, ToolError, Toolchain,
};

use super::plan::{BuildPlan, DATA_DIR};
use super::{format_size, StepTimer};

/// Project subdirectory that receives the binaries
pub const BIN_OUT: &str = "bin_out";

/// Port shown in dry runs when no board is connected
const DRY_RUN_PORT: &str = "<port>";

/// A SPIFFS image ready to flash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsImage {
    /// Image file
    pub path: PathBuf,
    /// Flash offset
    pub offset: u64,
}

/// Outcome of a pipeline run
#[derive(Debug, Clone)]
pub struct BuildSummary {
    /// Port the board was flashed through
    pub port: String,
    /// Partition scheme used
    pub scheme: String,
    /// Merged image, `None` on a dry run
    pub merged: Option<PathBuf>,
    /// SPIFFS image, if one was built
    pub fs_image: Option<FsImage>,
    /// Whether the SPIFFS image went into the merged image
    pub fs_embedded: bool,
    /// Total run time
    pub elapsed: Duration,
}

/// The build pipeline for one project
pub struct Pipeline<'a> {
    project: &'a Path,
    toolchain: &'a Toolchain,
    runner: &'a mut dyn CommandRunner,
    ports: &'a dyn PortEnumerator,
    log: RunLog,
    dry_run: bool,
}

impl<'a> Pipeline<'a> {
    /// Pipeline for `project` using `runner` for every tool
    pub fn new(
        project: &'a Path,
        toolchain: &'a Toolchain,
        runner: &'a mut dyn CommandRunner,
        ports: &'a dyn PortEnumerator,
    ) -> Self {
        Self {
            project,
            toolchain,
            runner,
            ports,
            log: RunLog::new(&toolchain.log_file),
            dry_run: false,
        }
    }

    /// Stop after compilation and leave the filesystem untouched
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run every step, recording the outcome in the run log
    pub fn run(mut self) -> Result<BuildSummary> {
        self.log.append(&format!("START {}", self.project.display()));
        let result = self.execute();
        match &result {
            Ok(summary) => self
                .log
                .append(&format!("TOTAL {:.2}s", summary.elapsed.as_secs_f64())),
            Err(e) => self.log.append(&format!("FAILED: {}", e)),
        }
        result
    }

    fn exec(&mut self, command: &ToolCommand) -> Result<()> {
        self.log.append(&format!("RUN {}", command));
        self.runner.run_checked(command)?;
        Ok(())
    }

    fn execute(&mut self) -> Result<BuildSummary> {
        let toolchain = self.toolchain;
        let run_log = self.log.clone();
        let mut timer = StepTimer::new(&run_log);

        let plan = BuildPlan::prepare(self.project, &toolchain.partition_tables())?;
        let config = &plan.config;
        println!("Sketch: {}", plan.sketch.display());
        println!("FQBN:   {}", plan.board);
        timer.step("PLAN");

        let build_dir = toolchain.build_dir(&plan.sketch_base);
        if self.dry_run {
            log::info!("[dry-run] build directory {}", build_dir.display());
        } else {
            fs::create_dir_all(&build_dir).map_err(|e| ToolError::io(&build_dir, e))?;
            if let Some(stats) = plan.payload {
                copy_payload(&plan.payload_dir(), &build_dir.join(DATA_DIR), stats.bytes)?;
                timer.step("COPY DATA");
            }
        }

        let port = match &config.port {
            Some(port) => {
                log::info!("Using port {}", port);
                port.clone()
            }
            None => match detect_port(self.ports) {
                Ok(port) => port,
                Err(ToolError::NoSerialPort) if self.dry_run => {
                    log::warn!("[dry-run] no serial port found");
                    DRY_RUN_PORT.to_string()
                }
                Err(e) => return Err(e),
            },
        };

        let esptool = Esptool::new(&toolchain.esptool, config.chip);
        if config.erase {
            self.exec(&esptool.erase_flash(&port))?;
            timer.step("ERASE FLASH");
        }

        let compile =
            ArduinoCli::new(&toolchain.arduino_cli).compile(&plan.board, &build_dir, self.project);
        self.exec(&compile)?;
        timer.step("COMPILATION");

        if self.dry_run {
            log::info!("[dry-run] stopping after compilation; later steps need its output");
            return Ok(BuildSummary {
                port,
                scheme: config.scheme.clone(),
                merged: None,
                fs_image: None,
                fs_embedded: false,
                elapsed: timer.elapsed(),
            });
        }

        let boot_app0 = toolchain.boot_app0()?;
        let bin_out = self.project.join(BIN_OUT);
        fs::create_dir_all(&bin_out).map_err(|e| ToolError::io(&bin_out, e))?;

        let built = MergeArtifacts::for_sketch(&build_dir, &plan.sketch_base, boot_app0);
        let artifacts = MergeArtifacts::for_sketch(&bin_out, &plan.sketch_base, boot_app0);
        for (src, dst) in built
            .compiler_outputs()
            .into_iter()
            .zip(artifacts.compiler_outputs())
        {
            expect_output("arduino-cli", src)?;
            fs::copy(src, dst).map_err(|e| ToolError::io(src, e))?;
            println!("-> {}", dst.display());
        }
        timer.step("COPY BINARIES");

        let fs_image = if config.wants_fs_image() {
            let image = self.build_fs_image(&plan, &bin_out)?;
            if image.is_some() {
                timer.step("MK_SPIFFS");
            }
            image
        } else {
            log::info!("No CUST directive: skipping SPIFFS");
            None
        };

        let mut layout = MergeLayout::plan(config.chip, &artifacts)?;
        let fs_embedded = toolchain.embed_filesystem && fs_image.is_some();
        if let (true, Some(image)) = (fs_embedded, &fs_image) {
            layout.append(image.offset, image.path.clone())?;
        }

        let merged = bin_out.join(format!("{}_merged.bin", plan.sketch_base));
        self.exec(&esptool.merge_bin(config.flash_size, &merged, &layout))?;
        expect_output("esptool", &merged)?;
        timer.step("MERGE BIN");

        self.exec(&esptool.write_file(&port, toolchain.baud, 0, &merged))?;
        timer.step("FLASH FIRMWARE");

        match &fs_image {
            Some(image) if !fs_embedded => {
                println!("Flashing SPIFFS to offset {} ...", format_offset(image.offset));
                self.exec(&esptool.write_file(&port, toolchain.baud, image.offset, &image.path))?;
                timer.step("FLASH SPIFFS");
            }
            Some(_) => log::info!("SPIFFS image embedded in {}", merged.display()),
            None => {}
        }

        Ok(BuildSummary {
            port,
            scheme: config.scheme.clone(),
            merged: Some(merged),
            fs_image,
            fs_embedded,
            elapsed: timer.elapsed(),
        })
    }

    fn build_fs_image(&mut self, plan: &BuildPlan, bin_out: &Path) -> Result<Option<FsImage>> {
        let Some(region) = plan.fs_region else {
            log::warn!(
                "Scheme '{}' has no SPIFFS partition: mkspiffs has nowhere to write",
                plan.config.scheme
            );
            return Ok(None);
        };

        let Some(fs_plan) = FsImagePlan::new(&plan.payload_dir(), region)? else {
            return Ok(None);
        };

        let output = bin_out.join(format!("{}.spiffs.bin", plan.sketch_base));
        println!("Building SPIFFS image of {} ...", format_size(fs_plan.image_size));
        let command = Mkspiffs::new(&self.toolchain.mkspiffs).create(&fs_plan, &output);
        self.exec(&command)?;
        expect_output("mkspiffs", &output)?;
        println!("SPIFFS generated: {}", output.display());

        Ok(Some(FsImage {
            path: output,
            offset: fs_plan.offset,
        }))
    }
}

fn expect_output(tool: &'static str, path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ToolError::MissingOutput {
            tool,
            path: path.to_path_buf(),
        })
    }
}

/// Replace `dst` with a copy of `src`, showing byte progress
fn copy_payload(src: &Path, dst: &Path, total: u64) -> Result<()> {
    if dst.exists() {
        fs::remove_dir_all(dst).map_err(|e| ToolError::io(dst, e))?;
    }

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] \
                 {bytes}/{total_bytes} Copying data/",
            )
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    copy_tree(src, dst, &pb)?;
    pb.finish_and_clear();
    println!("{}/ copied -> {}", DATA_DIR, dst.display());
    Ok(())
}

fn copy_tree(src: &Path, dst: &Path, pb: &ProgressBar) -> Result<()> {
    fs::create_dir_all(dst).map_err(|e| ToolError::io(dst, e))?;
    for entry in fs::read_dir(src).map_err(|e| ToolError::io(src, e))? {
        let entry = entry.map_err(|e| ToolError::io(src, e))?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| ToolError::io(&from, e))?;
        if file_type.is_dir() {
            copy_tree(&from, &to, pb)?;
        } else if file_type.is_symlink() && !from.is_file() {
            log::debug!("Not copying link {}", from.display());
        } else {
            let copied = fs::copy(&from, &to).map_err(|e| ToolError::io(&from, e))?;
            pb.inc(copied);
        }
    }
    Ok(())
}

/// Print the end-of-run summary
pub fn print_summary(summary: &BuildSummary) {
    println!();
    println!("Summary");
    println!("=======");
    println!("Port:    {}", summary.port);
    println!("Scheme:  {}", summary.scheme);
    match &summary.merged {
        Some(merged) => println!("Image:   {} at 0x0", merged.display()),
        None => println!("Image:   not built (dry run)"),
    }
    if let Some(image) = &summary.fs_image {
        println!(
            "SPIFFS:  {} at {}{}",
            image.path.display(),
            format_offset(image.offset),
            if summary.fs_embedded { " (embedded)" } else { "" }
        );
    }
    println!("Done. Total: {:.2}s", summary.elapsed.as_secs_f64());
}

/// Run the pipeline against real tools, or record commands on a dry run
pub fn run_build(project: &Path, toolchain: &Toolchain, dry_run: bool) -> Result<()> {
    let ports = SystemPorts;
    let summary = if dry_run {
        let mut runner = DryRunRunner::new();
        Pipeline::new(project, toolchain, &mut runner, &ports)
            .dry_run(true)
            .run()?
    } else {
        let mut runner = ProcessRunner::new();
        Pipeline::new(project, toolchain, &mut runner, &ports).run()?
    };
    print_summary(&summary);
    Ok(())
}
