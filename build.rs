fn main() {
    println!("cargo:rerun-if-env-changed=DOOR_WIFI_SSID");
    println!("cargo:rerun-if-env-changed=DOOR_WIFI_PASSWORD");
    println!("cargo:rerun-if-env-changed=DOOR_MQTT_HOST");
    println!("cargo:rerun-if-env-changed=DOOR_MQTT_USER");
    println!("cargo:rerun-if-env-changed=DOOR_MQTT_PASSWORD");
    println!("cargo:rerun-if-env-changed=DOOR_MQTT_TOPIC");

    // ESP-IDF toolchain environment is only needed for firmware builds.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
