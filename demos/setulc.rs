use std::{collections::BTreeMap, error::Error, io, io::Write};

use terminfo_compile::{CompileOptions, Descriptor, Value, compile_with};

fn main() -> Result<(), Box<dyn Error>> {
    let strings = BTreeMap::from([
        ("cup".to_owned(), r"\E[%i%p1%d;%p2%dH".to_owned()),
        ("sgr0".to_owned(), r"\E(B\E[m".to_owned()),
        ("smul".to_owned(), r"\E[4m".to_owned()),
        (
            "Setulc".to_owned(),
            r"\E[58:2::%p1%{65536}%/%d:%p1%{256}%/%{255}%&%d:%p1%{255}%&%d%;m".to_owned(),
        ),
    ]);
    let descriptor = Descriptor {
        name: "xterm-direct".to_owned(),
        names: vec!["xterm-direct".to_owned()],
        desc: "xterm with direct-color indexing".to_owned(),
        strings,
        ..Descriptor::default()
    };
    let terminal = compile_with(descriptor, &CompileOptions::from_env())?;

    let Some(setulc) = terminal.method("Setulc") else {
        println!("The terminal has no underline color capability");
        return Ok(());
    };
    println!("Found underline color capability Setulc={:?}", setulc.source());

    let mut stdout = io::stdout();
    for color in [0xFF_0000, 0x00_FF00, 0x00_00FF, 0xFF_8040] {
        let expanded = setulc.call(&[Value::from(color)]);
        let underline = terminal.call("smul", &[]).unwrap_or_default();
        let reset = terminal.call("sgr0", &[]).unwrap_or_default();
        write!(stdout, "{underline}{expanded}Color {color:06x}{reset}")?;
        println!(" {expanded:?}");
    }

    if let Some(cup) = terminal.call("cup", &[Value::from(0), Value::from(0)]) {
        println!("Cursor home is {cup:?}");
    }

    Ok(())
}
