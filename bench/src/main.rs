fn main() {
    println!("run `cargo bench` for the engine benchmarks");
}
