use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;
use wll_hooks::{
    DiscoveredProjects, HookConfig, HostCommands, MoveDeleteHook, Repository, Resource, Severity,
    Status, UpdateFlags,
};
use wll_index::{Edit, EntryMode, FileIndex, IndexBackend, IndexEntry, LockedIndex, ObjectId};

use crate::cli::*;
use crate::workspace::{DiscoveredMappings, FsHost, IgnoreOracle, CONFIG_FILE, INDEX_FILE};

const METADATA_DIR: &str = ".wll";

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("cannot determine current directory")?;
    match cli.command {
        Command::Init(args) => cmd_init(&cwd, args),
        Command::Add(args) => cmd_add(&Session::open(&cwd)?, &cwd, args),
        Command::LsFiles(args) => cmd_ls_files(&Session::open(&cwd)?, args, cli.format),
        Command::Rm(args) => cmd_rm(&Session::open(&cwd)?, &cwd, args),
        Command::Mv(args) => cmd_mv(&Session::open(&cwd)?, &cwd, args),
    }
}

/// A repository opened from the current directory, with the hook wired to
/// the filesystem.
struct Session {
    repository: Arc<Repository>,
    oracle: Arc<IgnoreOracle>,
    hook: MoveDeleteHook,
    host: FsHost,
}

impl Session {
    fn open(cwd: &Path) -> anyhow::Result<Self> {
        let mappings = Arc::new(DiscoveredMappings::new(METADATA_DIR));
        let work_tree = mappings
            .find_work_tree(cwd)
            .with_context(|| format!("not a wll repository (or any parent): {}", cwd.display()))?;
        let repository = mappings.repository(&work_tree);

        let config_path = repository.metadata_dir().join(CONFIG_FILE);
        let config = if config_path.is_file() {
            HookConfig::load(&config_path)
                .with_context(|| format!("loading {}", config_path.display()))?
        } else {
            HookConfig::default()
        };
        debug!(?config, work_tree = %work_tree.display(), "session opened");

        let oracle = Arc::new(IgnoreOracle::new());
        let hook = MoveDeleteHook::new(config, mappings, Arc::new(DiscoveredProjects))
            .with_oracle(oracle.clone());
        let host = FsHost::new(work_tree.parent().unwrap_or(work_tree.as_path()));
        Ok(Self {
            repository,
            oracle,
            hook,
            host,
        })
    }

    fn work_tree(&self) -> &Path {
        self.repository.work_tree()
    }

    fn relative(&self, location: &Path) -> anyhow::Result<String> {
        self.repository.relative_path(location).with_context(|| {
            format!(
                "{} is outside repository at {}",
                location.display(),
                self.work_tree().display()
            )
        })
    }

    fn display(&self, location: &Path) -> String {
        match self.repository.relative_path(location) {
            Some(rel) if !rel.is_empty() => rel,
            _ => location.display().to_string(),
        }
    }

    /// Print collected failures. Fails if any were reported.
    fn finish(&self) -> anyhow::Result<()> {
        let failures = self.host.take_failures();
        for status in &failures {
            match status.severity {
                Severity::Warning => eprintln!("{} {}", "warning:".yellow().bold(), status.message),
                Severity::Error => eprintln!("{} {}", "error:".red().bold(), status.message),
            }
        }
        if !failures.is_empty() {
            bail!("{} operation(s) did not complete", failures.len());
        }
        Ok(())
    }
}

/// `base.join(path)` with `.` and `..` resolved lexically.
fn absolute(base: &Path, path: &str) -> PathBuf {
    let mut out = PathBuf::new();
    for component in base.join(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn cmd_init(cwd: &Path, args: InitArgs) -> anyhow::Result<()> {
    let root = absolute(cwd, args.path.as_deref().unwrap_or("."));
    let metadata_dir = root.join(METADATA_DIR);
    if metadata_dir.exists() {
        bail!("already a wll repository: {}", root.display());
    }
    fs::create_dir_all(&metadata_dir)
        .with_context(|| format!("creating {}", metadata_dir.display()))?;

    let index = FileIndex::new(metadata_dir.join(INDEX_FILE));
    index.try_lock()?;
    index.commit(&[])?;
    fs::write(
        metadata_dir.join(CONFIG_FILE),
        toml::to_string(&HookConfig::default())?,
    )?;

    println!(
        "{} Initialized empty WLL repository in {}",
        "✓".green().bold(),
        metadata_dir.display().to_string().bold()
    );
    Ok(())
}

fn entry_mode(meta: &fs::Metadata) -> EntryMode {
    if meta.file_type().is_symlink() {
        return EntryMode::Symlink;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if meta.permissions().mode() & 0o111 != 0 {
            return EntryMode::Executable;
        }
    }
    EntryMode::Regular
}

fn stage_file(location: &Path, rel: String) -> anyhow::Result<IndexEntry> {
    let meta = fs::symlink_metadata(location)?;
    let mode = entry_mode(&meta);
    let content = match mode {
        EntryMode::Symlink => fs::read_link(location)?
            .to_string_lossy()
            .into_owned()
            .into_bytes(),
        _ => fs::read(location).with_context(|| format!("reading {}", location.display()))?,
    };
    let mut entry = IndexEntry::new(rel, ObjectId::for_content(&content), mode, content.len() as u64);
    if let Ok(mtime) = meta.modified() {
        entry.mtime = mtime;
    }
    Ok(entry)
}

fn cmd_add(session: &Session, cwd: &Path, args: AddArgs) -> anyhow::Result<()> {
    let mut staged = Vec::new();
    for arg in &args.paths {
        let location = absolute(cwd, arg);
        if fs::symlink_metadata(&location).is_err() {
            bail!("pathspec '{arg}' did not match any files");
        }
        let walker = WalkDir::new(&location)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != METADATA_DIR);
        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_dir() {
                continue;
            }
            let rel = session.relative(entry.path())?;
            // Explicitly named files are staged even when ignored.
            let named = entry.depth() == 0;
            if !named && session.oracle.is_ignored(session.work_tree(), &rel, false) {
                debug!(path = %rel, "add: ignored");
                continue;
            }
            staged.push(stage_file(entry.path(), rel)?);
        }
    }

    let mut locked = LockedIndex::acquire(session.repository.index())?;
    let mut editor = locked.editor();
    for entry in &staged {
        editor.add(Edit::PathEdit {
            path: entry.path.clone(),
            source: entry.clone(),
        });
    }
    editor.commit()?;

    for entry in &staged {
        println!("  {} {}", "staged:".green(), entry.path);
    }
    Ok(())
}

#[derive(Serialize)]
struct EntryView<'a> {
    path: &'a str,
    stage: u8,
    mode: String,
    size: u64,
    object_id: String,
}

fn cmd_ls_files(session: &Session, args: LsFilesArgs, format: OutputFormat) -> anyhow::Result<()> {
    let entries = session.repository.index().read()?;
    match format {
        OutputFormat::Json => {
            let views: Vec<EntryView<'_>> = entries
                .iter()
                .map(|e| EntryView {
                    path: &e.path,
                    stage: e.stage.number(),
                    mode: e.mode.to_string(),
                    size: e.size,
                    object_id: e.object_id.to_hex(),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&views)?);
        }
        OutputFormat::Text if args.stage => {
            for e in &entries {
                println!(
                    "{} {} {}\t{}",
                    e.mode,
                    e.object_id.short_hex().yellow(),
                    e.stage.number(),
                    e.path
                );
            }
        }
        OutputFormat::Text => {
            for e in &entries {
                println!("{}", e.path);
            }
        }
    }
    Ok(())
}

fn flags(force: bool) -> UpdateFlags {
    if force {
        UpdateFlags::FORCE
    } else {
        UpdateFlags::NONE
    }
}

fn cmd_rm(session: &Session, cwd: &Path, args: RmArgs) -> anyhow::Result<()> {
    let flags = flags(args.force);
    for arg in &args.paths {
        let location = absolute(cwd, arg);
        let meta = match fs::symlink_metadata(&location) {
            Ok(meta) => meta,
            Err(_) => bail!("pathspec '{arg}' did not match any files"),
        };
        if meta.is_dir() {
            remove_folder(session, &location, flags);
        } else {
            remove_file(session, &location, flags);
        }
    }
    session.finish()
}

/// Delete one file through the hook. Returns `true` if it is gone.
fn remove_file(session: &Session, location: &Path, flags: UpdateFlags) -> bool {
    let file = Resource::file(location);
    if !session.hook.delete_file(&session.host, &file, flags).is_claimed() {
        session.host.standard_delete_file(&file, flags);
    }
    let gone = fs::symlink_metadata(location).is_err();
    if gone {
        println!("  {} {}", "deleted:".red(), session.display(location));
    }
    gone
}

fn remove_folder(session: &Session, location: &Path, flags: UpdateFlags) {
    let folder = Resource::folder(location);
    if session.hook.delete_folder(&session.host, &folder, flags).is_claimed() {
        return;
    }

    let mut kept = 0usize;
    let walker = WalkDir::new(location)
        .contents_first(true)
        .into_iter()
        .filter_entry(|e| e.file_name() != METADATA_DIR);
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_dir() => {}
            Ok(entry) => {
                if !remove_file(session, entry.path(), flags) {
                    kept += 1;
                }
            }
            Err(e) => {
                session.host.failed(Status::error(e.to_string()));
                kept += 1;
            }
        }
    }

    if kept > 0 {
        session.host.failed(Status::warning(format!(
            "kept {}: {kept} file(s) could not be deleted",
            session.display(location)
        )));
        return;
    }
    session.host.standard_delete_folder(&folder, flags);
}

fn cmd_mv(session: &Session, cwd: &Path, args: MvArgs) -> anyhow::Result<()> {
    let flags = flags(args.force);
    let src_location = absolute(cwd, &args.src);
    let meta = match fs::symlink_metadata(&src_location) {
        Ok(meta) => meta,
        Err(_) => bail!("bad source '{}': no such file or directory", args.src),
    };
    let mut dst_location = absolute(cwd, &args.dst);
    if dst_location.is_dir() {
        if let Some(name) = src_location.file_name() {
            dst_location.push(name);
        }
    }
    if fs::symlink_metadata(&dst_location).is_ok() {
        bail!("destination exists: {}", dst_location.display());
    }

    let claimed = if meta.is_dir() {
        let (src, dst) = (Resource::folder(&src_location), Resource::folder(&dst_location));
        let claimed = session.hook.move_folder(&session.host, &src, &dst, flags).is_claimed();
        if !claimed {
            session.host.standard_move_folder(&src, &dst, flags);
        }
        claimed
    } else {
        let (src, dst) = (Resource::file(&src_location), Resource::file(&dst_location));
        let claimed = session.hook.move_file(&session.host, &src, &dst, flags).is_claimed();
        if !claimed {
            session.host.standard_move_file(&src, &dst, flags);
        }
        claimed
    };
    debug!(claimed, src = %src_location.display(), dst = %dst_location.display(), "mv");

    if fs::symlink_metadata(&src_location).is_err() {
        println!(
            "  {} {} -> {}",
            "renamed:".green(),
            session.display(&src_location),
            session.display(&dst_location)
        );
    }
    session.finish()
}
