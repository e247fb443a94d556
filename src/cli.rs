use clap::{value_parser, crate_version, Arg, ArgAction, Command, ValueHint};

const NAME_HELP: &str = "names are PETSCII, letters are put in upper case,
arbitrary bytes can be given as hex escapes, e.g., `\\xA0`";
const T_LONG_HELP: &str = "File types are the CBM DOS types.
The `sec` type accesses a disk sector directly, in which case the file argument
is the address <track>,<sector>.";
const CMD_LONG_HELP: &str = "Send the text to the command channel of the drive, just as
`OPEN 15,8,15,\"...\"` would, then print the error channel.
The image is saved afterwards unless `--dry-run` is given.";

fn file_arg(help: &'static str, req: bool, shell_hint: bool) -> Arg {
    let ans = Arg::new("file").short('f').long("file").value_name("NAME").required(req).help(help)
        .long_help(NAME_HELP);
    if shell_hint {
        ans.value_hint(ValueHint::FilePath)
    } else {
        ans
    }
}

fn indent_arg() -> Arg {
    Arg::new("indent").long("indent").help("JSON indentation, omit to minify")
        .value_name("SPACES")
        .value_parser(value_parser!(u16).range(0..16))
        .required(false)
}

fn dimg_arg(req: bool) -> Arg {
    Arg::new("dimg").short('d').long("dimg").help("path to disk image itself")
        .value_name("PATH")
        .value_hint(ValueHint::FilePath)
        .required(req)
}

fn read_only_arg() -> Arg {
    Arg::new("read-only").long("read-only").help("attach the image write protected")
        .action(ArgAction::SetTrue)
        .required(false)
}

fn console_arg() -> Arg {
    Arg::new("console").long("console").help("format for console unconditionally")
        .required(false)
        .action(ArgAction::SetTrue)
        .long_help("even if the output context is a file or pipe, format it for the console")
}

pub fn build_cli() -> Command {
    let long_help = "cbmkit is always invoked with exactly one of several subcommands.
The subcommands are generally designed to function as nodes in a pipeline.
Set RUST_LOG environment variable to control logging level.
  levels: trace,debug,info,warn,error

Examples:
---------
create 1541 image:     `cbmkit mkdsk -t d64 -n games -i 01 -d games.d64`
directory:             `cbmkit catalog -d games.d64`
copy file out:         `cbmkit get -f hello -t prg -d games.d64 > hello.prg`
copy file in:          `cbmkit put -f hello -t prg -d games.d64 < hello.prg`
read a sector:         `cbmkit get -f 18,0 -t sec -d games.d64`
DOS command:           `cbmkit cmd -c \"s:old*\" -d games.d64`";

    let img_types = ["d64","d67","d71","d80","d81","d82","x64","g64"];
    let get_put_types = ["prg","seq","usr","sec"];

    let mut main_cmd = Command::new("cbmkit")
        .about("Manipulates Commodore disk images through a virtual CBM DOS drive.")
        .after_long_help(long_help)
        .version(crate_version!());

    main_cmd = main_cmd.subcommand(Command::new("mkdsk")
        .arg(Arg::new("type").short('t').long("type").help("type of disk image to create")
            .value_name("TYPE")
            .value_parser(img_types)
            .required(true))
        .arg(Arg::new("name").short('n').long("name").help("disk name")
            .value_name("NAME")
            .long_help(NAME_HELP)
            .required(true))
        .arg(Arg::new("id").short('i').long("id").help("two character disk id")
            .value_name("ID")
            .required(false)
            .default_value("00"))
        .arg(Arg::new("tracks").long("tracks").help("number of tracks, 1541 images only")
            .value_name("COUNT")
            .value_parser(value_parser!(u16).range(35..43))
            .required(false))
        .arg(dimg_arg(true).help("disk image path to create"))
        .about("write a blank disk image to the given path"));

    main_cmd = main_cmd.subcommand(Command::new("catalog")
        .arg(file_arg("pattern such as `a*` or `*=p`",false,false))
        .arg(dimg_arg(true))
        .arg(Arg::new("raw").long("raw").help("output the listing program rather than text")
            .action(ArgAction::SetTrue))
        .visible_alias("ls")
        .visible_alias("dir")
        .about("write disk directory to stdout"));

    main_cmd = main_cmd.subcommand(Command::new("get")
        .arg(file_arg("name of file, or address of sector",true,false))
        .arg(Arg::new("type").short('t').long("type").help("type of the item")
            .value_name("TYPE")
            .long_help(T_LONG_HELP)
            .value_parser(get_put_types)
            .required(true))
        .arg(dimg_arg(true))
        .arg(console_arg())
        .about("read from a disk image and write to stdout"));

    main_cmd = main_cmd.subcommand(Command::new("put")
        .arg(file_arg("name of file, or address of sector",true,false))
        .arg(Arg::new("type").short('t').long("type").help("type of the item")
            .value_name("TYPE")
            .long_help(T_LONG_HELP)
            .value_parser(get_put_types)
            .required(true))
        .arg(dimg_arg(true))
        .arg(Arg::new("replace").short('r').long("replace").help("replace an existing file")
            .action(ArgAction::SetTrue))
        .about("read from stdin and write to a disk image"));

    main_cmd = main_cmd.subcommand(Command::new("delete")
        .arg(file_arg("name or pattern of files to scratch",true,false))
        .arg(dimg_arg(true))
        .visible_alias("del")
        .visible_alias("scratch")
        .about("scratch files from the disk image"));

    main_cmd = main_cmd.subcommand(Command::new("rename")
        .arg(file_arg("present name of the file",true,false))
        .arg(Arg::new("name").short('n').long("name").help("new name of the file")
            .value_name("NAME")
            .long_help(NAME_HELP)
            .required(true))
        .arg(dimg_arg(true))
        .about("rename a file on the disk image"));

    main_cmd = main_cmd.subcommand(Command::new("copy")
        .arg(file_arg("comma separated source files, these are concatenated",true,false))
        .arg(Arg::new("name").short('n').long("name").help("name of the new file")
            .value_name("NAME")
            .long_help(NAME_HELP)
            .required(true))
        .arg(dimg_arg(true))
        .about("copy files within the disk image"));

    main_cmd = main_cmd.subcommand(Command::new("validate")
        .arg(dimg_arg(true))
        .about("rebuild the BAM and remove unclosed files"));

    main_cmd = main_cmd.subcommand(Command::new("cmd")
        .arg(Arg::new("command").short('c').long("command").help("DOS command text")
            .value_name("TEXT")
            .long_help(CMD_LONG_HELP)
            .required(true))
        .arg(dimg_arg(true))
        .arg(Arg::new("dry-run").long("dry-run").help("do not save the image")
            .action(ArgAction::SetTrue))
        .arg(read_only_arg())
        .about("send a command to the drive and print the error channel"));

    main_cmd = main_cmd.subcommand(Command::new("stat")
        .arg(dimg_arg(true))
        .arg(indent_arg())
        .about("write disk and directory information as JSON"));

    main_cmd = main_cmd.subcommand(Command::new("geometry")
        .arg(dimg_arg(true))
        .arg(indent_arg())
        .about("write disk geometry as JSON"));

    main_cmd = main_cmd.subcommand(Command::new("completions")
        .arg(Arg::new("shell").short('s').long("shell").help("shell type")
            .value_name("SHELL")
            .value_parser(["bash","elv","fish","ps1","zsh"])
            .required(true))
        .about("write completions script to stdout"));

    main_cmd
}
