//! Resource sampling around the single store round-trip.
//!
//! The sampler snapshots CPU, memory, and IO counters from
//! `/proc/self/{stat,status,io}` on Linux and reports deltas (absolute
//! values for memory and thread count). Off Linux, or when a counter file
//! cannot be read, the affected fields degrade to zero; sampling never
//! fails the query.

use std::time::Instant;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryPerformance {
	pub elapsed_seconds: f64,
	pub cpu_user_seconds: f64,
	pub cpu_system_seconds: f64,
	pub resident_bytes: u64,
	pub virtual_bytes: u64,
	pub io_read_ops: u64,
	pub io_write_ops: u64,
	pub io_read_bytes: u64,
	pub io_write_bytes: u64,
	pub threads: u32,
	pub query_length: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct CpuTimes {
	user_seconds: f64,
	system_seconds: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct IoCounters {
	read_ops: u64,
	write_ops: u64,
	read_bytes: u64,
	write_bytes: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct MemoryStatus {
	resident_bytes: u64,
	virtual_bytes: u64,
	threads: u32,
}

#[derive(Debug)]
pub struct PerfSampler {
	started: Instant,
	start_cpu: CpuTimes,
	start_io: IoCounters,
	query_length: usize,
}
impl PerfSampler {
	pub fn start(query_length: usize) -> Self {
		Self {
			started: Instant::now(),
			start_cpu: cpu_times(),
			start_io: io_counters(),
			query_length,
		}
	}

	pub fn finish(self) -> QueryPerformance {
		let elapsed_seconds = self.started.elapsed().as_secs_f64();
		let end_cpu = cpu_times();
		let end_io = io_counters();
		let memory = memory_status();

		QueryPerformance {
			elapsed_seconds,
			cpu_user_seconds: (end_cpu.user_seconds - self.start_cpu.user_seconds).max(0.0),
			cpu_system_seconds: (end_cpu.system_seconds - self.start_cpu.system_seconds).max(0.0),
			resident_bytes: memory.resident_bytes,
			virtual_bytes: memory.virtual_bytes,
			io_read_ops: end_io.read_ops.saturating_sub(self.start_io.read_ops),
			io_write_ops: end_io.write_ops.saturating_sub(self.start_io.write_ops),
			io_read_bytes: end_io.read_bytes.saturating_sub(self.start_io.read_bytes),
			io_write_bytes: end_io.write_bytes.saturating_sub(self.start_io.write_bytes),
			threads: memory.threads,
			query_length: self.query_length,
		}
	}
}

#[cfg(target_os = "linux")]
fn cpu_times() -> CpuTimes {
	// /proc/self/stat fields 14 and 15 (utime, stime) in clock ticks.
	// The tick rate is fixed at 100 Hz on every mainstream kernel build.
	const TICKS_PER_SECOND: f64 = 100.0;

	let Ok(raw) = std::fs::read_to_string("/proc/self/stat") else {
		tracing::debug!("Failed to read /proc/self/stat.");

		return CpuTimes::default();
	};
	// The comm field (2) may contain spaces; skip past its closing paren.
	let Some((_, after_comm)) = raw.rsplit_once(')') else {
		return CpuTimes::default();
	};
	let fields: Vec<&str> = after_comm.split_whitespace().collect();
	let utime = fields.get(11).and_then(|field| field.parse::<u64>().ok()).unwrap_or(0);
	let stime = fields.get(12).and_then(|field| field.parse::<u64>().ok()).unwrap_or(0);

	CpuTimes {
		user_seconds: utime as f64 / TICKS_PER_SECOND,
		system_seconds: stime as f64 / TICKS_PER_SECOND,
	}
}

#[cfg(target_os = "linux")]
fn io_counters() -> IoCounters {
	let Ok(raw) = std::fs::read_to_string("/proc/self/io") else {
		tracing::debug!("Failed to read /proc/self/io.");

		return IoCounters::default();
	};
	let field = |name: &str| -> u64 {
		raw.lines()
			.find_map(|line| line.strip_prefix(name))
			.and_then(|rest| rest.trim_start_matches(':').trim().parse().ok())
			.unwrap_or(0)
	};

	IoCounters {
		read_ops: field("syscr"),
		write_ops: field("syscw"),
		read_bytes: field("read_bytes"),
		write_bytes: field("write_bytes"),
	}
}

#[cfg(target_os = "linux")]
fn memory_status() -> MemoryStatus {
	let Ok(raw) = std::fs::read_to_string("/proc/self/status") else {
		tracing::debug!("Failed to read /proc/self/status.");

		return MemoryStatus::default();
	};
	let field = |name: &str| -> u64 {
		raw.lines()
			.find_map(|line| line.strip_prefix(name))
			.and_then(|rest| {
				rest.trim_start_matches(':').trim().split_whitespace().next()?.parse().ok()
			})
			.unwrap_or(0)
	};

	MemoryStatus {
		// VmRSS and VmSize are reported in kB.
		resident_bytes: field("VmRSS") * 1_024,
		virtual_bytes: field("VmSize") * 1_024,
		threads: field("Threads") as u32,
	}
}

#[cfg(not(target_os = "linux"))]
fn cpu_times() -> CpuTimes {
	CpuTimes::default()
}

#[cfg(not(target_os = "linux"))]
fn io_counters() -> IoCounters {
	IoCounters::default()
}

#[cfg(not(target_os = "linux"))]
fn memory_status() -> MemoryStatus {
	MemoryStatus::default()
}
