use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use log::error;

use famicore::apu::NullAudio;
use famicore::audio::AudioOutput;
use famicore::cartridge::RomImage;
use famicore::cassette::WavCassette;
use famicore::disk::DiskImage;
use famicore::eventloop::EventLoop;
use famicore::machine::Machine;
use famicore::tas::InputMovie;

struct Options {
    rom: PathBuf,
    disk_bios: Option<PathBuf>,
    movie: Option<PathBuf>,
    cassette: Option<PathBuf>,
    disable_video: bool,
    disable_audio: bool,
    basic_mode: bool,
    video_scale: f32,
}

fn display_help(progname: &str) {
    println!("Usage: {} <options> [rom]", progname);
    println!(
        "Options:\n\
         \x20 -h        Display this help.\n\
         \x20 -v        Disable video output.\n\
         \x20 -a        Disable audio output.\n\
         \x20 -b        Enable BASIC mode with keyboard and data recorder.\n\
         \x20 -s N      Window scale factor (1-5).\n\
         \x20 -t FILE   Play back FILE as scripted controller input.\n\
         \x20 -c FILE   Insert FILE as a cassette WAV recording.\n\
         \x20 -f FILE   Enable the disk system and use FILE as its BIOS;\n\
         \x20           [rom] is then the disk image."
    );
}

fn parse_options() -> Result<Options, String> {
    let args: Vec<String> = std::env::args().collect();
    let progname = args[0].clone();
    let mut options = Options {
        rom: PathBuf::new(),
        disk_bios: None,
        movie: None,
        cassette: None,
        disable_video: false,
        disable_audio: false,
        basic_mode: false,
        video_scale: 3.0,
    };

    let mut rom = None;
    let mut iter = args.into_iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" => {
                display_help(&progname);
                std::process::exit(0);
            }
            "-v" => options.disable_video = true,
            "-a" => options.disable_audio = true,
            "-b" => options.basic_mode = true,
            "-s" => {
                let value = iter.next().ok_or("-s requires a value")?;
                options.video_scale = value.parse().map_err(|_| "Invalid scale factor")?;
            }
            "-t" => options.movie = Some(iter.next().ok_or("-t requires a file")?.into()),
            "-c" => options.cassette = Some(iter.next().ok_or("-c requires a file")?.into()),
            "-f" => options.disk_bios = Some(iter.next().ok_or("-f requires a file")?.into()),
            _ => rom = Some(PathBuf::from(arg)),
        }
    }

    match rom {
        Some(rom) => {
            options.rom = rom;
            Ok(options)
        }
        None => {
            display_help(&progname);
            Err("No ROM specified".into())
        }
    }
}

fn run() -> Result<(), String> {
    let options = parse_options()?;

    let mut machine = Machine::new();

    match &options.disk_bios {
        Some(bios_path) => {
            let bios = fs::read(bios_path)
                .map_err(|e| format!("Unable to load disk BIOS {}: {}", bios_path.display(), e))?;
            let image = fs::read(&options.rom)
                .map_err(|e| format!("Unable to load disk image {}: {}", options.rom.display(), e))?;
            machine.attach_disk_system(&bios, DiskImage::load(&image));
        }
        None => {
            let data = fs::read(&options.rom)
                .map_err(|e| format!("Unable to load ROM {}: {}", options.rom.display(), e))?;
            let image = RomImage::parse(&data).map_err(|e| e.to_string())?;
            machine.insert_rom(&image);
        }
    }

    let mut movie = match &options.movie {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("Unable to load input movie {}: {}", path.display(), e))?;
            Some(InputMovie::parse(&text))
        }
        None => None,
    };

    let mut cassette = WavCassette::new();
    if let Some(path) = &options.cassette {
        cassette.load_file(path).map_err(|e| e.to_string())?;
    }

    let mut event_loop = EventLoop::new(options.disable_video, options.video_scale, options.basic_mode)?;

    machine.reset();

    if options.disable_audio {
        event_loop.run(&mut machine, &mut NullAudio, &mut cassette, movie.as_mut())
    } else {
        match AudioOutput::new(event_loop.sdl(), 44100) {
            Ok(mut audio) => {
                audio.resume();
                event_loop.run(&mut machine, &mut audio, &mut cassette, movie.as_mut())
            }
            Err(e) => {
                log::warn!("Audio unavailable, continuing without: {}", e);
                event_loop.run(&mut machine, &mut NullAudio, &mut cassette, movie.as_mut())
            }
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{}", message);
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}
