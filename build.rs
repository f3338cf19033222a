fn main() {
    // Device builds need the ESP-IDF environment exported to rustc; host
    // builds (tests, fuzzing) have nothing to generate.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
