use std::io;
use std::io::Write;
use std::time;

use log::debug;


pub trait ProgressSink {
	fn update(&mut self, inow: usize, n: Option<usize>);
	fn finish(&mut self, inow: usize, n: Option<usize>);
}


pub struct TtyProgress {
	t0: time::Instant,
	tprev: time::Instant,
	iprev: usize,
}

impl TtyProgress {
	pub fn new() -> Self {
		let now = time::Instant::now();
		Self{
			t0: now,
			tprev: now,
			iprev: 0,
		}
	}

	fn reset(&mut self) {
		let now = time::Instant::now();
		self.t0 = now;
		self.tprev = now;
		self.iprev = 0;
	}
}

impl ProgressSink for TtyProgress {
	fn update(&mut self, inow: usize, n: Option<usize>) {
		let now = time::Instant::now();
		let dt = (now - self.tprev).as_secs_f64();
		let rate = inow.saturating_sub(self.iprev) as f64 / dt;
		match n {
			Some(n) => {
				let done = (inow as f64) / (n as f64);
				print!("{:6.0}% [{:9.2}/s]\r", done * 100.0, rate);
			},
			None => {
				print!("{:12} [{:9.2}/s]\r", inow, rate);
			},
		}
		let _ = io::stdout().flush();
		self.iprev = inow;
		self.tprev = now;
	}

	fn finish(&mut self, inow: usize, n: Option<usize>) {
		let dt = (time::Instant::now() - self.t0).as_secs_f64();
		let rate = inow as f64 / dt;
		match n {
			Some(_) => println!("{:6.0}% [{:9.2}/s]", 100.0, rate),
			None => println!("{:12} [{:9.2}/s]", inow, rate),
		}
		self.reset();
	}
}


pub struct LogProgress;

impl ProgressSink for LogProgress {
	fn update(&mut self, inow: usize, n: Option<usize>) {
		match n {
			Some(n) => debug!("{}/{} rows", inow, n),
			None => debug!("{} rows", inow),
		}
	}

	fn finish(&mut self, inow: usize, _n: Option<usize>) {
		debug!("done after {} rows", inow);
	}
}


pub struct Quiet;

impl ProgressSink for Quiet {
	fn update(&mut self, _inow: usize, _n: Option<usize>) {}
	fn finish(&mut self, _inow: usize, _n: Option<usize>) {}
}


pub fn default_output() -> Box<dyn ProgressSink> {
	if isatty::stdout_isatty() {
		Box::new(TtyProgress::new())
	} else {
		Box::new(LogProgress)
	}
}


pub struct CountMeter<'s, S: ProgressSink + ?Sized> {
	sink: &'s mut S,
	every: usize,
}

impl<'s, S: ProgressSink + ?Sized> CountMeter<'s, S> {
	pub fn new(sink: &'s mut S) -> Self {
		Self{
			sink,
			every: 100000,
		}
	}

	pub fn update(&mut self, inow: usize) {
		if inow % self.every == 0 {
			self.sink.update(inow, None);
		}
	}

	pub fn finish(self, inow: usize) {
		self.sink.finish(inow, Some(inow));
	}
}
