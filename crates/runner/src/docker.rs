use nship::DockerStep;

/// Builds the shell commands that leave the container of `step` running
/// with exactly this configuration.
///
/// Any previous container with the same name is removed first, so the
/// commands are safe to run repeatedly.
pub fn build_commands(step: &DockerStep) -> Vec<String> {
  let mut commands = vec![];

  if step.build.is_some() {
    commands.push(build_image_command(step));
  }

  commands.push(format!("docker rm -f {} 2>/dev/null || true", step.name));

  for network in &step.networks {
    commands.push(format!(
      "docker network create {} 2>/dev/null || true",
      network
    ));
  }

  commands.push(create_container_command(step));

  // Already attached through `--network` when created
  for network in &step.networks {
    commands.push(format!(
      "docker network connect {} {} 2>/dev/null || true",
      network, step.name
    ));
  }

  commands.push(format!("docker start {}", step.name));

  commands
}

fn build_image_command(step: &DockerStep) -> String {
  let mut docker_command: Vec<String> = ["docker", "build", "-t", step.image.as_str()]
    .iter()
    .map(|item| item.to_string())
    .collect();

  if let Some(build) = &step.build {
    for (key, value) in &build.args {
      docker_command.push("--build-arg".to_string());
      docker_command.push(format!("{}={}", key, value));
    }

    docker_command.push(build.context.clone());
  }

  docker_command.join(" ")
}

fn create_container_command(step: &DockerStep) -> String {
  let mut docker_command: Vec<String> = ["docker", "create", "--name", step.name.as_str()]
    .iter()
    .map(|item| item.to_string())
    .collect();

  if let Some(restart) = &step.restart {
    docker_command.push("--restart".to_string());
    docker_command.push(restart.to_string());
  }

  for (key, value) in &step.environment {
    docker_command.push("-e".to_string());
    docker_command.push(format!("{}={}", key, quote(value)));
  }

  for port in &step.ports {
    docker_command.push("-p".to_string());
    docker_command.push(port.to_string());
  }

  for volume in &step.volumes {
    docker_command.push("-v".to_string());
    docker_command.push(volume.to_string());
  }

  for (key, value) in &step.labels {
    docker_command.push("-l".to_string());
    docker_command.push(format!("{}={}", key, quote(value)));
  }

  for network in &step.networks {
    docker_command.push("--network".to_string());
    docker_command.push(network.to_string());
  }

  docker_command.push(step.image.clone());
  docker_command.extend(step.command.iter().cloned());

  docker_command.join(" ")
}

/// Double quotes `value`, escaping backslashes, quotes and control
/// characters.
fn quote(value: &str) -> String {
  let mut quoted = String::with_capacity(value.len() + 2);
  quoted.push('"');

  for ch in value.chars() {
    match ch {
      '"' => quoted.push_str("\\\""),
      '\\' => quoted.push_str("\\\\"),
      '\n' => quoted.push_str("\\n"),
      '\r' => quoted.push_str("\\r"),
      '\t' => quoted.push_str("\\t"),
      ch if ch.is_ascii_control() => quoted.push_str(&format!("\\x{:02x}", ch as u32)),
      ch if ch.is_control() => quoted.push_str(&format!("\\u{:04x}", ch as u32)),
      ch => quoted.push(ch),
    }
  }

  quoted.push('"');
  quoted
}
