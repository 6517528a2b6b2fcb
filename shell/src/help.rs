pub struct CommandHelp {
    pub name: &'static str,
    pub summary: &'static str,
    pub usage: &'static str,
    pub options: &'static [(&'static str, &'static str)],
}

pub const COMMANDS: &[CommandHelp] = &[
    CommandHelp {
        name: "alias",
        summary: "Define or display aliases",
        usage: "alias [name[=value] ...]",
        options: &[],
    },
    CommandHelp {
        name: "basename",
        summary: "Strip directory and suffix from filenames",
        usage: "basename PATH [SUFFIX]",
        options: &[],
    },
    CommandHelp {
        name: "cat",
        summary: "Concatenate and print files",
        usage: "cat [FILE]...",
        options: &[("-", "Read from stdin")],
    },
    CommandHelp {
        name: "cd",
        summary: "Change the current directory",
        usage: "cd [DIR]",
        options: &[],
    },
    CommandHelp {
        name: "clear",
        summary: "Clear the terminal screen",
        usage: "clear",
        options: &[],
    },
    CommandHelp {
        name: "cp",
        summary: "Copy files",
        usage: "cp SOURCE DEST",
        options: &[],
    },
    CommandHelp {
        name: "curl",
        summary: "Transfer data from or to a URL",
        usage: "curl [OPTION]... URL",
        options: &[
            ("-X METHOD", "Request method (default GET)"),
            ("-H HEADER", "Add a request header (Name: value)"),
            ("-d DATA", "Request body (implies POST)"),
            ("-o FILE", "Write response to FILE instead of stdout"),
        ],
    },
    CommandHelp {
        name: "cut",
        summary: "Remove sections from lines",
        usage: "cut [OPTION]... [FILE]",
        options: &[
            ("-d DELIM", "Use DELIM as field delimiter"),
            ("-f FIELDS", "Select only these fields (comma-separated)"),
            ("-c RANGE", "Select only these characters"),
        ],
    },
    CommandHelp {
        name: "date",
        summary: "Display the current date and time",
        usage: "date [+FORMAT]",
        options: &[("+FORMAT", "Output format (e.g., +%Y-%m-%d %H:%M:%S)")],
    },
    CommandHelp {
        name: "dirname",
        summary: "Strip last component from filename",
        usage: "dirname PATH",
        options: &[],
    },
    CommandHelp {
        name: "echo",
        summary: "Display a line of text",
        usage: "echo [-en] [STRING]...",
        options: &[
            ("-e", "Interpret escape sequences (\\n, \\t, etc.)"),
            ("-n", "Do not output trailing newline"),
        ],
    },
    CommandHelp {
        name: "env",
        summary: "Display shell variables",
        usage: "env",
        options: &[],
    },
    CommandHelp {
        name: "exit",
        summary: "Exit the shell",
        usage: "exit [CODE]",
        options: &[],
    },
    CommandHelp {
        name: "export",
        summary: "Set shell variables",
        usage: "export NAME=VALUE...",
        options: &[],
    },
    CommandHelp {
        name: "false",
        summary: "Return failure exit code",
        usage: "false",
        options: &[],
    },
    CommandHelp {
        name: "file",
        summary: "Determine file type",
        usage: "file FILE...",
        options: &[],
    },
    CommandHelp {
        name: "grep",
        summary: "Search for patterns in files",
        usage: "grep [OPTION]... PATTERN [FILE]...",
        options: &[
            ("-i", "Ignore case"),
            ("-v", "Invert match"),
            ("-n", "Prefix matches with line numbers"),
            ("-c", "Print only a count of matching lines"),
            ("-q", "Quiet; exit 0 on first match"),
            ("-E", "Use extended regular expressions"),
        ],
    },
    CommandHelp {
        name: "head",
        summary: "Output the first part of files",
        usage: "head [-n NUM] [FILE]",
        options: &[("-n NUM", "Print first NUM lines (default 10)")],
    },
    CommandHelp {
        name: "help",
        summary: "Display help for commands",
        usage: "help [COMMAND]",
        options: &[],
    },
    CommandHelp {
        name: "history",
        summary: "Display the command history",
        usage: "history",
        options: &[],
    },
    CommandHelp {
        name: "local",
        summary: "Declare function-local variables",
        usage: "local NAME[=VALUE]...",
        options: &[],
    },
    CommandHelp {
        name: "ls",
        summary: "List directory contents",
        usage: "ls [-la] [PATH]",
        options: &[
            ("-l", "Long listing format"),
            ("-a", "Include hidden entries"),
        ],
    },
    CommandHelp {
        name: "mkdir",
        summary: "Create directories",
        usage: "mkdir [-p] DIR...",
        options: &[("-p", "Create parent directories as needed")],
    },
    CommandHelp {
        name: "mv",
        summary: "Move or rename files",
        usage: "mv SOURCE DEST",
        options: &[],
    },
    CommandHelp {
        name: "printf",
        summary: "Format and print data",
        usage: "printf FORMAT [ARG]...",
        options: &[("%s, %d, %%", "Supported conversions")],
    },
    CommandHelp {
        name: "pwd",
        summary: "Print the current directory",
        usage: "pwd",
        options: &[],
    },
    CommandHelp {
        name: "read",
        summary: "Read a line from stdin into a variable",
        usage: "read [NAME]",
        options: &[],
    },
    CommandHelp {
        name: "rm",
        summary: "Remove files or directories",
        usage: "rm [-rf] PATH...",
        options: &[
            ("-r", "Remove directories recursively"),
            ("-f", "Ignore missing files"),
        ],
    },
    CommandHelp {
        name: "seq",
        summary: "Print a sequence of numbers",
        usage: "seq [FIRST [STEP]] LAST",
        options: &[],
    },
    CommandHelp {
        name: "set",
        summary: "Display shell variables",
        usage: "set",
        options: &[],
    },
    CommandHelp {
        name: "sleep",
        summary: "Delay for a number of seconds",
        usage: "sleep SECONDS",
        options: &[],
    },
    CommandHelp {
        name: "sort",
        summary: "Sort lines of text",
        usage: "sort [-rnu] [FILE]",
        options: &[
            ("-r", "Reverse the result"),
            ("-n", "Compare numerically"),
            ("-u", "Output only unique lines"),
        ],
    },
    CommandHelp {
        name: "source",
        summary: "Run a script in the current shell",
        usage: "source FILE",
        options: &[],
    },
    CommandHelp {
        name: "stat",
        summary: "Display file status",
        usage: "stat FILE...",
        options: &[],
    },
    CommandHelp {
        name: "tail",
        summary: "Output the last part of files",
        usage: "tail [-n NUM] [FILE]",
        options: &[("-n NUM", "Print last NUM lines (default 10)")],
    },
    CommandHelp {
        name: "tar",
        summary: "Pack or unpack archives in the sandbox",
        usage: "tar -cf ARCHIVE PATH... | tar -xf ARCHIVE [-C DIR] | tar -tf ARCHIVE",
        options: &[
            ("-c", "Create an archive"),
            ("-x", "Extract an archive"),
            ("-t", "List archive contents"),
            ("-f FILE", "Archive file"),
            ("-C DIR", "Extract into DIR"),
        ],
    },
    CommandHelp {
        name: "tee",
        summary: "Copy stdin to stdout and files",
        usage: "tee [-a] [FILE]...",
        options: &[("-a", "Append instead of overwrite")],
    },
    CommandHelp {
        name: "test",
        summary: "Evaluate a conditional expression",
        usage: "test EXPRESSION | [ EXPRESSION ]",
        options: &[
            ("-e/-f/-d/-s", "File exists / is regular / is directory / is non-empty"),
            ("-n/-z", "String is non-empty / empty"),
            ("=, !=", "String comparison"),
            ("-eq -ne -lt -le -gt -ge", "Integer comparison"),
        ],
    },
    CommandHelp {
        name: "touch",
        summary: "Create empty files",
        usage: "touch FILE...",
        options: &[],
    },
    CommandHelp {
        name: "tr",
        summary: "Translate or delete characters",
        usage: "tr SET1 SET2 | tr -d SET",
        options: &[("-d", "Delete characters in SET1")],
    },
    CommandHelp {
        name: "true",
        summary: "Return success exit code",
        usage: "true",
        options: &[],
    },
    CommandHelp {
        name: "type",
        summary: "Describe how a name would be resolved",
        usage: "type NAME...",
        options: &[],
    },
    CommandHelp {
        name: "unalias",
        summary: "Remove aliases",
        usage: "unalias NAME...",
        options: &[],
    },
    CommandHelp {
        name: "uniq",
        summary: "Filter adjacent duplicate lines",
        usage: "uniq [-c] [FILE]",
        options: &[("-c", "Prefix lines with occurrence counts")],
    },
    CommandHelp {
        name: "unset",
        summary: "Remove shell variables",
        usage: "unset NAME...",
        options: &[],
    },
    CommandHelp {
        name: "wc",
        summary: "Count lines, words and bytes",
        usage: "wc [-lwc] [FILE]",
        options: &[
            ("-l", "Count lines"),
            ("-w", "Count words"),
            ("-c", "Count bytes"),
        ],
    },
    CommandHelp {
        name: "wget",
        summary: "Download a URL into the sandbox",
        usage: "wget [-O FILE] URL",
        options: &[("-O FILE", "Write to FILE instead of the URL basename")],
    },
    CommandHelp {
        name: "which",
        summary: "Locate a command",
        usage: "which NAME...",
        options: &[],
    },
    CommandHelp {
        name: "xargs",
        summary: "Build a command line from stdin",
        usage: "xargs [COMMAND [ARG]...]",
        options: &[],
    },
];

pub fn get_help(name: &str) -> Option<&'static CommandHelp> {
    COMMANDS.iter().find(|c| c.name == name)
}

pub fn format_help(cmd: &CommandHelp) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} - {}\n\n", cmd.name, cmd.summary));
    out.push_str(&format!("Usage: {}\n", cmd.usage));
    if !cmd.options.is_empty() {
        out.push_str("\nOptions:\n");
        for (opt, desc) in cmd.options {
            out.push_str(&format!("  {:16} {}\n", opt, desc));
        }
    }
    out
}

pub fn format_help_list() -> String {
    let mut out = String::new();
    out.push_str("sandsh - Sandbox Shell Commands\n\n");
    out.push_str("Available commands:\n\n");

    for cmd in COMMANDS {
        out.push_str(&format!("  {:12} {}\n", cmd.name, cmd.summary));
    }

    out.push_str("\nUse 'help COMMAND' or 'COMMAND --help' for more information.\n");
    out
}

pub fn wants_help(args: &[String]) -> bool {
    args.iter().any(|a| a == "--help")
}
