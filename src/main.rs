fn main() {
    if let Err(e) = sentinel_inference_lib::run() {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
