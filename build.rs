fn main() {
    // Only the device build links against ESP-IDF; host builds (tests,
    // simulation) skip the sysenv export entirely.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
