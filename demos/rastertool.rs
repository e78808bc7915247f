use clap::{App, Arg, SubCommand};
use rasterdec::ico::{self, IcoDirectory};
use rasterdec::RasterImage;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

//===========================================================================//

fn main() {
    env_logger::init();
    let matches = App::new("rastertool")
        .version("0.1")
        .about("Inspects and converts ICO and XPM images")
        .subcommand(
            SubCommand::with_name("convert")
                .about("Decodes an ICO or XPM file and writes it as a PNG")
                .arg(
                    Arg::with_name("output")
                        .takes_value(true)
                        .value_name("PATH")
                        .short("o")
                        .long("output")
                        .help("Sets output path"),
                )
                .arg(
                    Arg::with_name("index")
                        .takes_value(true)
                        .value_name("N")
                        .short("i")
                        .long("index")
                        .help("Converts entry N of an ICO file"),
                )
                .arg(Arg::with_name("input").required(true)),
        )
        .subcommand(
            SubCommand::with_name("list")
                .about("Lists images in an ICO file")
                .arg(Arg::with_name("ico").required(true)),
        )
        .get_matches();
    if let Some(submatches) = matches.subcommand_matches("convert") {
        let path = submatches.value_of("input").unwrap();
        let file = BufReader::new(fs::File::open(path).unwrap());
        let image = if let Some(index) = submatches.value_of("index") {
            let index = index.parse::<usize>().unwrap();
            let mut file = file;
            let icodir = IcoDirectory::read(&mut file).unwrap();
            icodir.entries()[index].decode(&mut file).unwrap()
        } else {
            rasterdec::decode(file).unwrap()
        };
        let out_path = if let Some(out) = submatches.value_of("output") {
            PathBuf::from(out)
        } else {
            Path::new(path).with_extension("png")
        };
        println!(
            "Writing {}x{} image to {:?}",
            image.width(),
            image.height(),
            out_path
        );
        write_png(&image, &out_path);
    } else if let Some(submatches) = matches.subcommand_matches("list") {
        let path = submatches.value_of("ico").unwrap();
        let mut file = fs::File::open(path).unwrap();
        let icodir = IcoDirectory::read(&mut file).unwrap();
        println!("Resource type: {}", icodir.resource_type());
        for (index, entry) in icodir.entries().iter().enumerate() {
            let data = entry.read_data(&mut file).unwrap();
            let kind = if ico::is_png(&data) { "PNG" } else { "BMP" };
            let suffix = if let Some((x, y)) = entry.cursor_hotspot() {
                format!("hotspot at ({}, {})", x, y)
            } else {
                format!("{} bpp", entry.color_depth())
            };
            println!(
                "{:5}: {}x{} {}, {}",
                index,
                entry.width(),
                entry.height(),
                kind,
                suffix
            );
        }
    }
}

fn write_png(image: &RasterImage, path: &Path) {
    let file = fs::File::create(path).unwrap();
    let mut encoder = png::Encoder::new(file, image.width(), image.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(image.rgba_data()).unwrap();
    writer.finish().unwrap();
}

//===========================================================================//
