//! Embed sandsh as a scripting engine in your Rust application.
//!
//! Run:  cargo run -p sandsh --example embed

use async_trait::async_trait;
use sandsh::{Runtime, RuntimeOutput, Shell, ShellBuilder, ShellResult};
use std::sync::Arc;

/// Toy language runtime: "programs" are whitespace-separated integers,
/// the output is their sum.
struct SumRuntime;

#[async_trait]
impl Runtime for SumRuntime {
    async fn execute(&self, code: &str) -> RuntimeOutput {
        let total: i64 = code
            .split_whitespace()
            .filter_map(|s| s.parse::<i64>().ok())
            .sum();
        RuntimeOutput {
            exit_code: 0,
            stdout: format!("{}\n", total),
            stderr: String::new(),
        }
    }
}

fn print_capture(label: &str, out: &sandsh::CapturedOutput) {
    println!("\n== {label} ==");
    println!("exit: {}", out.exit_code);

    if out.stdout.is_empty() {
        println!("stdout: <empty>");
    } else {
        println!("stdout:\n{}", out.stdout);
    }

    if out.stderr.is_empty() {
        println!("stderr: <empty>");
    } else {
        println!("stderr:\n{}", out.stderr);
    }
}

#[tokio::main]
async fn main() -> ShellResult<()> {
    let mut shell = ShellBuilder::new()
        .env("APP_NAME", "embed-demo")
        .builtin(
            "set_from_builder",
            Arc::new(|args: &[String], shell: &mut Shell| {
                let value = args.first().map_or("unset", String::as_str);
                shell.set_var("FROM_BUILDER", value);
                Ok(0)
            }),
        )
        .runtime("sum", Arc::new(SumRuntime))
        .build();

    println!("sandsh embedded demo");
    println!("APP_NAME from builder env: {:?}", shell.get_var("APP_NAME"));

    let out = shell.execute_capture("set_from_builder configured").await;
    print_capture("builder builtin", &out);
    println!(
        "FROM_BUILDER after command: {:?}",
        shell.get_var("FROM_BUILDER")
    );

    shell.set_var("EXPLICIT", "set_via_set_var");
    let out = shell.execute_capture("echo $EXPLICIT").await;
    print_capture("set_var/get_var", &out);

    let out = shell.execute_capture("x=42; echo $((x * 2))").await;
    print_capture("variables + arithmetic", &out);

    let out = shell
        .execute_capture("for i in 1 2 3; do echo \"item $i\"; done")
        .await;
    print_capture("control flow (for loop)", &out);

    shell
        .execute("greet() { echo \"hello from function\"; }")
        .await?;
    let out = shell.execute_capture("greet").await;
    print_capture("function definition + call", &out);

    let out = shell
        .execute_capture("printf 'apple\\nbanana\\napricot\\n' | grep ap | wc -l")
        .await;
    print_capture("pipeline", &out);

    let out = shell
        .execute_capture("mkdir -p /data && echo sandboxed > /data/note && cat /data/note")
        .await;
    print_capture("virtual filesystem", &out);

    let out = shell.execute_capture("sum -c '1 2 3 4'").await;
    print_capture("language runtime (sum)", &out);

    let out = shell.execute_capture("cat /nonexistent").await;
    print_capture("stderr capture", &out);

    Ok(())
}
