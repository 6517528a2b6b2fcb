//! Filesystem builtins over the sandbox VFS

use super::utils::format_mtime;
use super::ExecContext;
use crate::error::{ShellError, ShellResult};
use crate::shell::Shell;
use std::time::UNIX_EPOCH;

impl Shell {
    pub(crate) async fn try_execute_fs_builtin(
        &mut self,
        name: &str,
        args: &[String],
        ctx: &mut ExecContext,
    ) -> Option<ShellResult<i32>> {
        match name {
            "pwd" | "cd" | "ls" | "mkdir" | "touch" | "rm" | "mv" | "cp" | "stat" | "file"
            | "tar" | "basename" | "dirname" => {
                Some(self.dispatch_fs_builtin(name, args, ctx).await)
            }
            _ => None,
        }
    }

    async fn dispatch_fs_builtin(
        &mut self,
        name: &str,
        args: &[String],
        ctx: &mut ExecContext,
    ) -> ShellResult<i32> {
        match name {
            "pwd" => self.cmd_pwd(ctx),
            "cd" => self.cmd_cd(args, ctx),
            "ls" => self.cmd_ls(args, ctx),
            "mkdir" => self.cmd_mkdir(args, ctx),
            "touch" => self.cmd_touch(args, ctx),
            "rm" => self.cmd_rm(args, ctx),
            "mv" => self.cmd_mv(args, ctx),
            "cp" => self.cmd_cp(args, ctx),
            "stat" => self.cmd_stat(args, ctx),
            "file" => self.cmd_file(args, ctx),
            "tar" => self.cmd_tar(args, ctx),
            "basename" => self.cmd_basename(args, ctx),
            "dirname" => self.cmd_dirname(args, ctx),
            _ => unreachable!(),
        }
    }

    fn cmd_pwd(&mut self, ctx: &mut ExecContext) -> ShellResult<i32> {
        ctx.stdout.writeln(&self.vfs.cwd()).map_err(ShellError::Io)?;
        Ok(0)
    }

    fn cmd_cd(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        let path = args.first().map(|s| s.as_str()).unwrap_or("/");
        let target = self.vfs.resolve(path);
        match self.vfs.set_cwd(&target) {
            Ok(()) => Ok(0),
            Err(e) => {
                ctx.write_err(&format!("cd: {}", e));
                Ok(1)
            }
        }
    }

    fn cmd_ls(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        let mut long_format = false;
        let mut show_hidden = false;
        let mut path = ".";

        for arg in args {
            if arg.starts_with('-') && arg.len() > 1 {
                for c in arg[1..].chars() {
                    match c {
                        'l' => long_format = true,
                        'a' => show_hidden = true,
                        _ => {}
                    }
                }
            } else {
                path = arg;
            }
        }

        let full_path = self.vfs.resolve(path);

        // A plain file lists as itself
        match self.vfs.stat(&full_path) {
            Ok(info) if !info.is_dir() => {
                if long_format {
                    ctx.stdout
                        .writeln(&format_long_entry(path, &info))
                        .map_err(ShellError::Io)?;
                } else {
                    ctx.stdout.writeln(path).map_err(ShellError::Io)?;
                }
                return Ok(0);
            }
            Err(e) => {
                ctx.write_err(&format!("ls: {}", e));
                return Ok(1);
            }
            _ => {}
        }

        match self.vfs.readdir_stats(&full_path) {
            Ok(mut entries) => {
                entries.sort_by(|a, b| a.0.cmp(&b.0));
                for (name, info) in entries {
                    if !show_hidden && name.starts_with('.') {
                        continue;
                    }
                    if long_format {
                        ctx.stdout
                            .writeln(&format_long_entry(&name, &info))
                            .map_err(ShellError::Io)?;
                    } else {
                        ctx.stdout.writeln(&name).map_err(ShellError::Io)?;
                    }
                }
                Ok(0)
            }
            Err(e) => {
                ctx.write_err(&format!("ls: {}", e));
                Ok(1)
            }
        }
    }

    fn cmd_mkdir(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        let parents = args.iter().any(|a| a == "-p");
        for path in args.iter().filter(|a| !a.starts_with('-')) {
            let full_path = self.vfs.resolve(path);
            let result = if parents {
                self.vfs.mkdir_p(&full_path)
            } else {
                self.vfs.mkdir(&full_path)
            };
            if let Err(e) = result {
                ctx.write_err(&format!("mkdir: {}", e));
                return Ok(1);
            }
        }
        Ok(0)
    }

    fn cmd_touch(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        for path in args.iter().filter(|a| !a.starts_with('-')) {
            let full_path = self.vfs.resolve(path);
            if self.vfs.exists(&full_path) {
                continue;
            }
            if let Err(e) = self.vfs.write_file(&full_path, &[]) {
                ctx.write_err(&format!("touch: {}", e));
                return Ok(1);
            }
        }
        Ok(0)
    }

    fn cmd_rm(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        let mut recursive = false;
        let mut force = false;
        let mut paths: Vec<&str> = Vec::new();

        for arg in args {
            if arg.starts_with('-') && arg.len() > 1 {
                for c in arg[1..].chars() {
                    match c {
                        'r' | 'R' => recursive = true,
                        'f' => force = true,
                        _ => {}
                    }
                }
            } else {
                paths.push(arg);
            }
        }

        for path in paths {
            let full_path = self.vfs.resolve(path);
            let result = if recursive {
                self.vfs.remove_all(&full_path)
            } else {
                self.vfs.unlink(&full_path)
            };
            if let Err(e) = result {
                if force {
                    continue;
                }
                ctx.write_err(&format!("rm: {}", e));
                return Ok(1);
            }
        }
        Ok(0)
    }

    fn cmd_mv(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        if args.len() != 2 {
            ctx.write_err("mv: requires two arguments");
            return Ok(1);
        }
        let src = self.vfs.resolve(&args[0]);
        let mut dst = self.vfs.resolve(&args[1]);

        // Moving into a directory keeps the source name
        if let Ok(info) = self.vfs.stat(&dst) {
            if info.is_dir() {
                dst = join_under(&dst, base_name(&src));
            }
        }

        if let Err(e) = self.vfs.rename(&src, &dst) {
            ctx.write_err(&format!("mv: {}", e));
            return Ok(1);
        }
        Ok(0)
    }

    fn cmd_cp(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        if args.len() != 2 {
            ctx.write_err("cp: requires two arguments");
            return Ok(1);
        }
        let src = self.vfs.resolve(&args[0]);
        let mut dst = self.vfs.resolve(&args[1]);

        let data = match self.vfs.read_file(&src) {
            Ok(d) => d,
            Err(e) => {
                ctx.write_err(&format!("cp: {}", e));
                return Ok(1);
            }
        };

        if let Ok(info) = self.vfs.stat(&dst) {
            if info.is_dir() {
                dst = join_under(&dst, base_name(&src));
            }
        }

        if let Err(e) = self.vfs.write_file(&dst, &data) {
            ctx.write_err(&format!("cp: {}", e));
            return Ok(1);
        }
        Ok(0)
    }

    fn cmd_stat(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        for path in args.iter().filter(|a| !a.starts_with('-')) {
            let full_path = self.vfs.resolve(path);
            match self.vfs.stat(&full_path) {
                Ok(info) => {
                    let kind = if info.is_dir() { "directory" } else { "file" };
                    ctx.stdout
                        .writeln(&format!("file: {}", path))
                        .map_err(ShellError::Io)?;
                    ctx.stdout
                        .writeln(&format!("size: {}", info.size))
                        .map_err(ShellError::Io)?;
                    ctx.stdout
                        .writeln(&format!("type: {}", kind))
                        .map_err(ShellError::Io)?;
                    ctx.stdout
                        .writeln(&format!("modified: {}", format_mtime(epoch_secs(&info))))
                        .map_err(ShellError::Io)?;
                }
                Err(e) => {
                    ctx.write_err(&format!("stat: {}", e));
                    return Ok(1);
                }
            }
        }
        Ok(0)
    }

    fn cmd_file(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        for path in args.iter().filter(|a| !a.starts_with('-')) {
            let full_path = self.vfs.resolve(path);
            let kind = match self.vfs.stat(&full_path) {
                Ok(info) if info.is_dir() => "directory".to_string(),
                Ok(info) if info.size == 0 => "empty".to_string(),
                Ok(_) => match self.vfs.read_file(&full_path) {
                    Ok(data) if std::str::from_utf8(&data).is_ok() => "ASCII text".to_string(),
                    Ok(_) => "data".to_string(),
                    Err(e) => {
                        ctx.write_err(&format!("file: {}", e));
                        return Ok(1);
                    }
                },
                Err(e) => {
                    ctx.write_err(&format!("file: {}", e));
                    return Ok(1);
                }
            };
            ctx.stdout
                .writeln(&format!("{}: {}", path, kind))
                .map_err(ShellError::Io)?;
        }
        Ok(0)
    }

    /// `tar -cf archive paths...`, `tar -xf archive [-C dir]`,
    /// `tar -tf archive`. Archives live in the VFS like any other file.
    fn cmd_tar(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        let mut create = false;
        let mut extract = false;
        let mut list = false;
        let mut archive: Option<String> = None;
        let mut dest_dir: Option<String> = None;
        let mut paths: Vec<String> = Vec::new();

        let mut expect_file = false;
        let mut expect_dir = false;
        for arg in args {
            if expect_file {
                archive = Some(arg.clone());
                expect_file = false;
                continue;
            }
            if expect_dir {
                dest_dir = Some(arg.clone());
                expect_dir = false;
                continue;
            }
            if let Some(flags) = arg.strip_prefix('-') {
                for c in flags.chars() {
                    match c {
                        'c' => create = true,
                        'x' => extract = true,
                        't' => list = true,
                        'f' => expect_file = true,
                        'C' => expect_dir = true,
                        _ => {}
                    }
                }
            } else {
                paths.push(arg.clone());
            }
        }

        let archive = match archive {
            Some(a) => self.vfs.resolve(&a),
            None => {
                ctx.write_err("tar: no archive given (use -f)");
                return Ok(1);
            }
        };

        if create {
            self.tar_create(&archive, &paths, ctx)
        } else if extract || list {
            self.tar_read(&archive, dest_dir.as_deref(), list, ctx)
        } else {
            ctx.write_err("tar: one of -c, -x or -t is required");
            Ok(1)
        }
    }

    fn tar_create(
        &mut self,
        archive: &str,
        paths: &[String],
        ctx: &mut ExecContext,
    ) -> ShellResult<i32> {
        if paths.is_empty() {
            ctx.write_err("tar: no files to archive");
            return Ok(1);
        }

        let mut entries: Vec<(String, bool)> = Vec::new();
        for path in paths {
            let full = self.vfs.resolve(path);
            if let Err(e) = self.collect_tree(&full, &mut entries) {
                ctx.write_err(&format!("tar: {}", e));
                return Ok(1);
            }
        }

        let mut builder = tar::Builder::new(Vec::new());
        for (path, is_dir) in &entries {
            let name = path.trim_start_matches('/');
            let mut header = tar::Header::new_gnu();
            header.set_mtime(0);
            if *is_dir {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_mode(0o755);
                header.set_size(0);
                if let Err(e) =
                    builder.append_data(&mut header, format!("{}/", name), std::io::empty())
                {
                    ctx.write_err(&format!("tar: {}", e));
                    return Ok(1);
                }
            } else {
                let data = match self.vfs.read_file(path) {
                    Ok(d) => d,
                    Err(e) => {
                        ctx.write_err(&format!("tar: {}", e));
                        return Ok(1);
                    }
                };
                header.set_entry_type(tar::EntryType::Regular);
                header.set_mode(0o644);
                header.set_size(data.len() as u64);
                if let Err(e) = builder.append_data(&mut header, name, &data[..]) {
                    ctx.write_err(&format!("tar: {}", e));
                    return Ok(1);
                }
            }
        }

        let bytes = match builder.into_inner() {
            Ok(b) => b,
            Err(e) => {
                ctx.write_err(&format!("tar: {}", e));
                return Ok(1);
            }
        };

        if let Err(e) = self.vfs.write_file(archive, &bytes) {
            ctx.write_err(&format!("tar: {}", e));
            return Ok(1);
        }
        Ok(0)
    }

    fn tar_read(
        &mut self,
        archive: &str,
        dest_dir: Option<&str>,
        list_only: bool,
        ctx: &mut ExecContext,
    ) -> ShellResult<i32> {
        use std::io::Read;

        let data = match self.vfs.read_file(archive) {
            Ok(d) => d,
            Err(e) => {
                ctx.write_err(&format!("tar: {}", e));
                return Ok(1);
            }
        };

        let base = dest_dir
            .map(|d| self.vfs.resolve(d))
            .unwrap_or_else(|| self.vfs.cwd());

        let mut reader = tar::Archive::new(&data[..]);
        let entries = match reader.entries() {
            Ok(e) => e,
            Err(e) => {
                ctx.write_err(&format!("tar: {}", e));
                return Ok(1);
            }
        };

        for entry in entries {
            let mut entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    ctx.write_err(&format!("tar: {}", e));
                    return Ok(1);
                }
            };
            let name = match entry.path() {
                Ok(p) => p.to_string_lossy().into_owned(),
                Err(e) => {
                    ctx.write_err(&format!("tar: {}", e));
                    return Ok(1);
                }
            };

            if list_only {
                ctx.stdout.writeln(&name).map_err(ShellError::Io)?;
                continue;
            }

            let target = join_under(&base, name.trim_end_matches('/'));
            if entry.header().entry_type().is_dir() {
                if let Err(e) = self.vfs.mkdir_p(&target) {
                    ctx.write_err(&format!("tar: {}", e));
                    return Ok(1);
                }
            } else {
                if let Some(idx) = target.rfind('/') {
                    if idx > 0 {
                        if let Err(e) = self.vfs.mkdir_p(&target[..idx]) {
                            ctx.write_err(&format!("tar: {}", e));
                            return Ok(1);
                        }
                    }
                }
                let mut contents = Vec::new();
                if let Err(e) = entry.read_to_end(&mut contents) {
                    ctx.write_err(&format!("tar: {}", e));
                    return Ok(1);
                }
                if let Err(e) = self.vfs.write_file(&target, &contents) {
                    ctx.write_err(&format!("tar: {}", e));
                    return Ok(1);
                }
            }
        }
        Ok(0)
    }

    /// Depth-first listing of a subtree as (absolute path, is_dir),
    /// parents before children.
    fn collect_tree(
        &self,
        path: &str,
        out: &mut Vec<(String, bool)>,
    ) -> sandsh_vfs::VfsResult<()> {
        let info = self.vfs.stat(path)?;
        if !info.is_dir() {
            out.push((path.to_string(), false));
            return Ok(());
        }
        out.push((path.to_string(), true));
        let mut names = self.vfs.readdir(path)?;
        names.sort();
        for name in names {
            self.collect_tree(&join_under(path, &name), out)?;
        }
        Ok(())
    }

    fn cmd_basename(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        if args.is_empty() {
            ctx.write_err("basename: missing operand");
            return Ok(1);
        }
        let path = args[0].trim_end_matches('/');
        let name = if path.is_empty() { "/" } else { base_name(path) };
        let result = match args.get(1) {
            Some(suffix) => name.strip_suffix(suffix.as_str()).unwrap_or(name),
            None => name,
        };
        ctx.stdout.writeln(result).map_err(ShellError::Io)?;
        Ok(0)
    }

    fn cmd_dirname(&mut self, args: &[String], ctx: &mut ExecContext) -> ShellResult<i32> {
        if args.is_empty() {
            ctx.write_err("dirname: missing operand");
            return Ok(1);
        }
        let path = args[0].trim_end_matches('/');
        let result = match path.rfind('/') {
            Some(0) => "/",
            Some(idx) => &path[..idx],
            None => ".",
        };
        ctx.stdout.writeln(result).map_err(ShellError::Io)?;
        Ok(0)
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn join_under(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{}{}", dir, name)
    } else {
        format!("{}/{}", dir, name)
    }
}

fn epoch_secs(info: &sandsh_vfs::FileStat) -> u64 {
    info.mtime
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn format_long_entry(name: &str, info: &sandsh_vfs::FileStat) -> String {
    let type_char = if info.is_dir() { 'd' } else { '-' };
    let mode = info.mode;
    let mode_str = format!(
        "{}{}{}{}{}{}{}{}{}",
        if mode & 0o400 != 0 { 'r' } else { '-' },
        if mode & 0o200 != 0 { 'w' } else { '-' },
        if mode & 0o100 != 0 { 'x' } else { '-' },
        if mode & 0o040 != 0 { 'r' } else { '-' },
        if mode & 0o020 != 0 { 'w' } else { '-' },
        if mode & 0o010 != 0 { 'x' } else { '-' },
        if mode & 0o004 != 0 { 'r' } else { '-' },
        if mode & 0o002 != 0 { 'w' } else { '-' },
        if mode & 0o001 != 0 { 'x' } else { '-' },
    );
    format!(
        "{}{} {:>8} {} {}",
        type_char,
        mode_str,
        info.size,
        format_mtime(epoch_secs(info)),
        name
    )
}

#[cfg(test)]
mod tests {
    use crate::shell::Shell;

    #[tokio::test]
    async fn pwd_and_cd() {
        let mut shell = Shell::new();
        assert_eq!(shell.execute_capture("pwd").await.stdout, "/\n");
        shell.execute_capture("mkdir /work").await;
        let out = shell.execute_capture("cd /work; pwd").await;
        assert_eq!(out.stdout, "/work\n");
    }

    #[tokio::test]
    async fn cd_rejects_files_and_missing_paths() {
        let mut shell = Shell::new();
        shell.execute_capture("echo x > /f").await;
        assert_eq!(shell.execute_capture("cd /f").await.exit_code, 1);
        assert_eq!(shell.execute_capture("cd /nope").await.exit_code, 1);
        assert_eq!(shell.execute_capture("pwd").await.stdout, "/\n");
    }

    #[tokio::test]
    async fn ls_sorts_and_hides_dotfiles() {
        let mut shell = Shell::new();
        shell.execute_capture("touch /b /a /.hidden").await;
        assert_eq!(shell.execute_capture("ls /").await.stdout, "a\nb\n");
        assert_eq!(
            shell.execute_capture("ls -a /").await.stdout,
            ".hidden\na\nb\n"
        );
    }

    #[tokio::test]
    async fn ls_long_format_shape() {
        let mut shell = Shell::new();
        shell.execute_capture("echo data > /f").await;
        let out = shell.execute_capture("ls -l /f").await;
        assert!(out.stdout.starts_with("-rw-"));
        assert!(out.stdout.contains("/f"));
    }

    #[tokio::test]
    async fn mkdir_p_is_idempotent() {
        let mut shell = Shell::new();
        assert_eq!(
            shell.execute_capture("mkdir -p /a/b/c").await.exit_code,
            0
        );
        assert_eq!(
            shell.execute_capture("mkdir -p /a/b/c").await.exit_code,
            0
        );
        assert_eq!(shell.execute_capture("mkdir /a").await.exit_code, 1);
    }

    #[tokio::test]
    async fn touch_preserves_content() {
        let mut shell = Shell::new();
        shell.execute_capture("echo keep > /f; touch /f").await;
        assert_eq!(shell.execute_capture("cat /f").await.stdout, "keep\n");
    }

    #[tokio::test]
    async fn rm_recursive_and_force() {
        let mut shell = Shell::new();
        shell.execute_capture("mkdir -p /d/sub; echo x > /d/sub/f").await;
        assert_eq!(shell.execute_capture("rm /d").await.exit_code, 1);
        assert_eq!(shell.execute_capture("rm -r /d").await.exit_code, 0);
        assert_eq!(shell.execute_capture("test -e /d").await.exit_code, 1);
        assert_eq!(shell.execute_capture("rm -f /nope").await.exit_code, 0);
    }

    #[tokio::test]
    async fn mv_renames_and_moves_into_dir() {
        let mut shell = Shell::new();
        shell.execute_capture("echo x > /a; mkdir /d").await;
        shell.execute_capture("mv /a /b").await;
        assert_eq!(shell.execute_capture("cat /b").await.stdout, "x\n");
        shell.execute_capture("mv /b /d").await;
        assert_eq!(shell.execute_capture("cat /d/b").await.stdout, "x\n");
    }

    #[tokio::test]
    async fn cp_copies_content() {
        let mut shell = Shell::new();
        shell.execute_capture("echo orig > /src").await;
        shell.execute_capture("cp /src /dst").await;
        shell.execute_capture("echo changed > /src").await;
        assert_eq!(shell.execute_capture("cat /dst").await.stdout, "orig\n");
    }

    #[tokio::test]
    async fn stat_reports_size_and_type() {
        let mut shell = Shell::new();
        shell.execute_capture("echo 12345 > /f").await;
        let out = shell.execute_capture("stat /f").await;
        assert!(out.stdout.contains("size: 6"));
        assert!(out.stdout.contains("type: file"));
    }

    #[tokio::test]
    async fn file_classifies() {
        let mut shell = Shell::new();
        shell.execute_capture("mkdir /d; echo text > /t; touch /e").await;
        assert_eq!(
            shell.execute_capture("file /d").await.stdout,
            "/d: directory\n"
        );
        assert_eq!(
            shell.execute_capture("file /t").await.stdout,
            "/t: ASCII text\n"
        );
        assert_eq!(shell.execute_capture("file /e").await.stdout, "/e: empty\n");
    }

    #[tokio::test]
    async fn tar_round_trip() {
        let mut shell = Shell::new();
        shell
            .execute_capture("mkdir -p /src/sub; echo one > /src/a; echo two > /src/sub/b")
            .await;
        assert_eq!(
            shell.execute_capture("tar -cf /arc.tar /src").await.exit_code,
            0
        );

        let listing = shell.execute_capture("tar -tf /arc.tar").await;
        assert!(listing.stdout.contains("src/a"));
        assert!(listing.stdout.contains("src/sub/b"));

        shell.execute_capture("mkdir /out").await;
        assert_eq!(
            shell
                .execute_capture("tar -xf /arc.tar -C /out")
                .await
                .exit_code,
            0
        );
        assert_eq!(
            shell.execute_capture("cat /out/src/a").await.stdout,
            "one\n"
        );
        assert_eq!(
            shell.execute_capture("cat /out/src/sub/b").await.stdout,
            "two\n"
        );
    }

    #[tokio::test]
    async fn basename_and_dirname() {
        let mut shell = Shell::new();
        assert_eq!(
            shell.execute_capture("basename /a/b/c.txt").await.stdout,
            "c.txt\n"
        );
        assert_eq!(
            shell.execute_capture("basename /a/b/c.txt .txt").await.stdout,
            "c\n"
        );
        assert_eq!(
            shell.execute_capture("dirname /a/b/c.txt").await.stdout,
            "/a/b\n"
        );
        assert_eq!(shell.execute_capture("dirname file").await.stdout, ".\n");
        assert_eq!(shell.execute_capture("dirname /top").await.stdout, "/\n");
    }
}
