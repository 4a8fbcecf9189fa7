use std::process::Command;

fn formseal(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_formseal"))
        .args(args)
        .env("SECRET", "s3cret")
        .output()
        .unwrap()
}

#[test]
fn unknown_command_exits_with_failure() {
    let output = formseal(&["frobnicate"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Commands:"));
}

#[test]
fn wrong_arity_exits_with_failure() {
    assert!(!formseal(&["seal"]).status.success());
    assert!(!formseal(&["open", "a", "b"]).status.success());
}

#[test]
fn seal_then_open_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contact.json");
    std::fs::write(
        &path,
        r#"{"smtpHost":"smtp.example.com","smtpPort":587,"smtpUsername":"u",
            "smtpPassword":"p","from":"a@example.com","to":["b@example.com"],
            "subject":"Contact","fields":["name"]}"#,
    )
    .unwrap();

    let sealed = formseal(&["seal", path.to_str().unwrap()]);
    assert!(sealed.status.success());
    let token = String::from_utf8(sealed.stdout).unwrap();

    let opened = formseal(&["open", token.trim()]);
    assert!(opened.status.success());
    let printed = String::from_utf8(opened.stdout).unwrap();
    assert!(printed.contains("smtp.example.com"));
    assert!(!printed.contains("\"p\""));
}
