#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use xmlbridge::core::{
    CommandProcessor, EngineConfig, ProcessInvocation, TransformError, XsltProcessor,
};

fn shell_engine(dir: &Path, script: &str, prefixes: (&str, &str, &str)) -> CommandProcessor {
    let path = dir.join("engine.sh");
    fs::write(&path, script).unwrap();
    CommandProcessor::new(&EngineConfig {
        program: "sh".to_string(),
        args: vec![path.display().to_string()],
        source_prefix: prefixes.0.to_string(),
        stylesheet_prefix: prefixes.1.to_string(),
        output_prefix: prefixes.2.to_string(),
        timeout_secs: 30,
    })
}

fn invocation(dir: &Path, timeout: Duration) -> ProcessInvocation {
    let input = dir.join("in.xml");
    let stylesheet = dir.join("step.xsl");
    fs::write(&input, "<in/>").unwrap();
    fs::write(&stylesheet, "<xsl:stylesheet/>").unwrap();
    ProcessInvocation {
        input,
        stylesheet,
        output: dir.join("out.xml"),
        timeout,
    }
}

#[tokio::test]
async fn test_successful_run_writes_output() {
    let dir = TempDir::new().unwrap();
    let engine = shell_engine(
        dir.path(),
        "cp \"$1\" \"$3\"\necho 'Saxon-HE 10.6 chatter'\n",
        ("", "", ""),
    );
    let call = invocation(dir.path(), Duration::from_secs(30));

    engine.run(&call).await.unwrap();

    assert_eq!(fs::read_to_string(&call.output).unwrap(), "<in/>");
}

#[tokio::test]
async fn test_prefixed_arguments_reach_the_engine() {
    let dir = TempDir::new().unwrap();
    let engine = shell_engine(
        dir.path(),
        "out=\"${3#-o:}\"\nprintf '%s\\n' \"$@\" > \"$out\"\n",
        ("-s:", "-xsl:", "-o:"),
    );
    let call = invocation(dir.path(), Duration::from_secs(30));

    engine.run(&call).await.unwrap();

    let expected = format!(
        "-s:{}\n-xsl:{}\n-o:{}\n",
        call.input.display(),
        call.stylesheet.display(),
        call.output.display()
    );
    assert_eq!(fs::read_to_string(&call.output).unwrap(), expected);
}

#[tokio::test]
async fn test_non_zero_exit_carries_stderr_verbatim() {
    let dir = TempDir::new().unwrap();
    let engine = shell_engine(
        dir.path(),
        "echo 'Static error in step.xsl' >&2\necho '  on line 12' >&2\nexit 4\n",
        ("", "", ""),
    );
    let call = invocation(dir.path(), Duration::from_secs(30));

    let err = engine.run(&call).await.unwrap_err();

    match err {
        TransformError::TransformationFailed {
            stylesheet,
            exit_code,
            stderr,
        } => {
            assert_eq!(stylesheet, call.stylesheet);
            assert_eq!(exit_code, Some(4));
            assert_eq!(stderr, "Static error in step.xsl\n  on line 12\n");
        }
        other => panic!("expected TransformationFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_timeout_kills_the_engine() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("finished");
    let engine = shell_engine(
        dir.path(),
        &format!("sleep 5\ntouch '{}'\n", marker.display()),
        ("", "", ""),
    );
    let call = invocation(dir.path(), Duration::from_millis(200));

    let started = Instant::now();
    let err = engine.run(&call).await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(4));
    match &err {
        TransformError::TransformationTimeout { timeout, .. } => {
            assert_eq!(*timeout, Duration::from_millis(200))
        }
        other => panic!("expected TransformationTimeout, got {:?}", other),
    }
    assert_eq!(err.code(), "XB-ENG-002");

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(!marker.exists(), "engine kept running after the timeout");
}

#[tokio::test]
async fn test_timeout_covers_background_helpers_holding_the_pipes() {
    let dir = TempDir::new().unwrap();
    // The engine exits at once but leaves a helper holding stdout and stderr open.
    let engine = shell_engine(dir.path(), "sleep 4 &\ncp \"$1\" \"$3\"\n", ("", "", ""));
    let call = invocation(dir.path(), Duration::from_millis(500));

    let started = Instant::now();
    let err = engine.run(&call).await.unwrap_err();

    assert!(
        started.elapsed() < Duration::from_secs(3),
        "run outlived its timeout: {:?}",
        started.elapsed()
    );
    assert!(matches!(err, TransformError::TransformationTimeout { .. }));
}

#[tokio::test]
async fn test_large_output_does_not_block() {
    let dir = TempDir::new().unwrap();
    let engine = shell_engine(
        dir.path(),
        "i=0\nwhile [ $i -lt 20000 ]; do echo \"progress line $i\"; echo \"warning $i\" >&2; i=$((i+1)); done\ncp \"$1\" \"$3\"\n",
        ("", "", ""),
    );
    let call = invocation(dir.path(), Duration::from_secs(60));

    engine.run(&call).await.unwrap();
    assert!(call.output.exists());
}
