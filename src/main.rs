use std::collections::BTreeMap;
use std::path::PathBuf;

use pmdesk::config::Config;
use pmdesk::gateway::HttpGateway;
use pmdesk::mapping::parse_record_id;
use pmdesk::types::NewInvoice;
use pmdesk::ApiClient;

type Api = ApiClient<HttpGateway>;

#[derive(clap::Parser)]
#[command(about = "Manage clients, projects, tasks and invoices")]
struct Options {
	/// Configuration file with the backend connection.
	#[arg(short, long)]
	#[arg(value_name = "FILE")]
	#[arg(default_value = "pmdesk.toml")]
	config: PathBuf,

	/// Print more log messages. Can be repeated.
	#[arg(short, long)]
	#[arg(action = clap::ArgAction::Count)]
	verbose: u8,

	#[command(subcommand)]
	command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
	/// Manage clients.
	#[command(subcommand)]
	Clients(RecordCommand),

	/// Manage projects.
	#[command(subcommand)]
	Projects(RecordCommand),

	/// Manage tasks.
	#[command(subcommand)]
	Tasks(TaskCommand),

	/// Track time on a task.
	#[command(subcommand)]
	Timer(TimerCommand),

	/// Manage invoices.
	#[command(subcommand)]
	Invoices(InvoiceCommand),

	/// Show the dashboard summary.
	Dashboard,
}

#[derive(clap::Subcommand)]
enum RecordCommand {
	List,
	Get { id: String },
	Delete { id: String },
}

#[derive(clap::Subcommand)]
enum TaskCommand {
	List,
	Get { id: String },
	Delete { id: String },
	/// Change the status of a task.
	Status { id: String, status: String },
	/// Show open tasks grouped by client and project.
	Tree,
}

#[derive(clap::Subcommand)]
enum TimerCommand {
	Start { task_id: String },
	Stop { task_id: String },
	Logs { task_id: String },
}

#[derive(clap::Subcommand)]
enum InvoiceCommand {
	List,
	Get { id: String },
	Create {
		#[arg(long)]
		project: Option<u64>,
		#[arg(long)]
		amount: f64,
		#[arg(long)]
		due_date: Option<String>,
		#[arg(long)]
		client: Option<u64>,
	},
	/// Mark a draft invoice as sent.
	Send { id: String },
	/// Mark an invoice as paid.
	Pay {
		id: String,
		/// Payment date, as YYYY-MM-DD or RFC 3339 timestamp.
		#[arg(long)]
		date: String,
	},
	Delete { id: String },
}

#[tokio::main]
async fn main() {
	let options: Options = clap::Parser::parse();
	let level = match options.verbose {
		0 => "info",
		1 => "debug",
		_ => "trace",
	};
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

	if do_main(options).await.is_err() {
		std::process::exit(1);
	}
}

async fn do_main(options: Options) -> Result<(), ()> {
	let config = Config::from_file(&options.config)?;
	let gateway = HttpGateway::new(config.gateway)
		.map_err(|e| log::error!("{}", e))?;
	let api = ApiClient::new(gateway);

	match options.command {
		Command::Clients(command) => match command {
			RecordCommand::List => print_json(&api.get_clients().await.map_err(drop)?),
			RecordCommand::Get { id } => print_json(&api.get_client(parse_id(&id, "client")?).await.map_err(drop)?),
			RecordCommand::Delete { id } => print_json(&api.delete_client(parse_id(&id, "client")?).await.map_err(drop)?),
		},
		Command::Projects(command) => match command {
			RecordCommand::List => print_json(&api.get_projects().await.map_err(drop)?),
			RecordCommand::Get { id } => print_json(&api.get_project(parse_id(&id, "project")?).await.map_err(drop)?),
			RecordCommand::Delete { id } => print_json(&api.delete_project(parse_id(&id, "project")?).await.map_err(drop)?),
		},
		Command::Tasks(command) => match command {
			TaskCommand::List => print_json(&api.get_tasks().await.map_err(drop)?),
			TaskCommand::Get { id } => print_json(&api.get_task(parse_id(&id, "task")?).await.map_err(drop)?),
			TaskCommand::Delete { id } => print_json(&api.delete_task(parse_id(&id, "task")?).await.map_err(drop)?),
			TaskCommand::Status { id, status } => {
				print_json(&api.update_task_status(parse_id(&id, "task")?, &status).await.map_err(drop)?)
			},
			TaskCommand::Tree => list_tasks(&api).await,
		},
		Command::Timer(command) => match command {
			TimerCommand::Start { task_id } => print_json(&api.start_task_timer(parse_id(&task_id, "task")?).await.map_err(drop)?),
			TimerCommand::Stop { task_id } => print_json(&api.stop_task_timer(parse_id(&task_id, "task")?).await.map_err(drop)?),
			TimerCommand::Logs { task_id } => print_json(&api.get_task_time_logs(parse_id(&task_id, "task")?).await.map_err(drop)?),
		},
		Command::Invoices(command) => match command {
			InvoiceCommand::List => print_json(&api.get_invoices().await.map_err(drop)?),
			InvoiceCommand::Get { id } => print_json(&api.get_invoice(parse_id(&id, "invoice")?).await.map_err(drop)?),
			InvoiceCommand::Create { project, amount, due_date, client } => {
				let invoice = NewInvoice {
					project_id: project,
					amount,
					due_date,
					client_id: client,
				};
				print_json(&api.create_invoice(&invoice).await.map_err(drop)?)
			},
			InvoiceCommand::Send { id } => print_json(&api.mark_invoice_as_sent(parse_id(&id, "invoice")?).await.map_err(drop)?),
			InvoiceCommand::Pay { id, date } => {
				print_json(&api.mark_invoice_as_paid(parse_id(&id, "invoice")?, &date).await.map_err(drop)?)
			},
			InvoiceCommand::Delete { id } => print_json(&api.delete_invoice(parse_id(&id, "invoice")?).await.map_err(drop)?),
		},
		Command::Dashboard => print_json(&api.get_dashboard_data().await),
	}
}

fn parse_id(input: &str, entity: &str) -> Result<u64, ()> {
	parse_record_id(input, entity).map_err(|e| log::error!("{}", e))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), ()> {
	let data = serde_json::to_string_pretty(value)
		.map_err(|e| log::error!("Failed to format output: {}", e))?;
	println!("{}", data);
	Ok(())
}

async fn list_tasks(api: &Api) -> Result<(), ()> {
	let mut clients = api.get_clients().await.map_err(drop)?;
	clients.sort_by(|a, b| a.name.cmp(&b.name));

	let projects = api.get_projects().await.map_err(drop)?;
	let projects_by_client_id = index_by(projects, |x| x.client_id);

	let tasks = api.get_tasks().await.map_err(drop)?;
	let tasks_by_project_id = index_by(tasks, |x| x.project_id);

	for client in &clients {
		let projects = projects_by_client_id.get(&Some(client.id));
		if let Some(projects) = projects {
			println!("{} ({})", client.name, client.id);
			for project in projects {
				println!("  {} ({})", project.name, project.id);
				let tasks = tasks_by_project_id.get(&Some(project.id)).map(|x| x.as_slice()).unwrap_or_else(|| &[]);
				for task in tasks {
					if task.status != "done" && task.status != "completed" {
						println!("    {} ({}) [{}]", task.title, task.id, task.status);
					}
				}
			}
		}
	}

	Ok(())
}

fn index_by<I, F, T, K>(input: I, mut key: F) -> BTreeMap<K, Vec<T>>
where
	I: IntoIterator<Item = T>,
	F: FnMut(&T) -> K,
	K: std::cmp::Ord,
{
	let mut result = BTreeMap::<K, Vec<T>>::new();
	for item in input {
		result.entry(key(&item)).or_default().push(item);
	}
	result
}
