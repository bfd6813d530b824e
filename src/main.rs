use std::{
    fs::File,
    io::{self, BufReader, Read},
};

use anyhow::{anyhow, Context};
use basic_compiler::{
    driver::{Driver, WriterSink},
    lexer::{ByteSource, Scanner},
    parser::{Parser, DEFAULT_MAX_DEPTH},
    precedence::{Binding, PrecedenceTable},
};
use clap::{crate_version, App, Arg, ArgMatches};

struct Options {
    quiet: bool,
    dump_ast: bool,
    max_depth: usize,
    operators: PrecedenceTable,
}

impl Options {
    fn from_matches(matches: &ArgMatches) -> anyhow::Result<Self> {
        let max_depth = match matches.value_of("max-depth") {
            Some(depth) => depth
                .parse()
                .with_context(|| format!("invalid --max-depth {:?}", depth))?,
            None => DEFAULT_MAX_DEPTH,
        };

        let mut operators = PrecedenceTable::default();
        for binding in matches.values_of("binop").into_iter().flatten() {
            operators.install_binding(binding.parse::<Binding>()?)?;
        }

        Ok(Options {
            quiet: matches.is_present("quiet"),
            dump_ast: matches.is_present("dump-ast"),
            max_depth,
            operators,
        })
    }
}

fn run<R: Read>(reader: R, options: Options) -> anyhow::Result<()> {
    let parser = Parser::new(Scanner::new(ByteSource::new(reader)))
        .with_precedence(options.operators)
        .max_depth(options.max_depth);

    let mut sink = WriterSink::new(io::stderr());
    sink.quiet = options.quiet;
    sink.dump_ast = options.dump_ast;

    let mut driver = Driver::new(parser, sink);
    driver.run().context("failed to write diagnostics")?;

    let (parser, _) = driver.into_parts();
    if let Some(err) = parser.into_scanner().into_source().take_error() {
        return Err(anyhow!(err).context("failed to read input"));
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let matches = App::new("basic-compiler")
        .version(crate_version!())
        .about("parses function definitions, externs and expressions, reporting each as it goes")
        .arg(
            Arg::with_name("input")
                .help("source file to read, standard input when absent")
                .index(1),
        )
        .arg(
            Arg::with_name("quiet")
                .short("q")
                .long("quiet")
                .help("don't print the ready> prompt"),
        )
        .arg(
            Arg::with_name("dump-ast")
                .long("dump-ast")
                .help("print every parsed node after reporting it"),
        )
        .arg(
            Arg::with_name("max-depth")
                .long("max-depth")
                .takes_value(true)
                .value_name("N")
                .help("deepest expression nesting accepted"),
        )
        .arg(
            Arg::with_name("binop")
                .long("binop")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1)
                .value_name("OP=PREC")
                .help("install an extra binary operator, e.g. --binop '&=15'"),
        )
        .get_matches();

    let options = Options::from_matches(&matches)?;

    match matches.value_of("input") {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("failed to open {}", path))?;
            run(BufReader::new(file), options)
        }
        None => {
            let stdin = io::stdin();
            run(stdin.lock(), options)
        }
    }
}
