use crate::cmd::{connect, resolve_property, GetArgs, Session};
use crate::exit::{ncp_error, CliResult, SUCCESS};
use crate::output::{print_property, PropertyOutput};

pub fn run(args: GetArgs, session: Session) -> CliResult<i32> {
    let connection = connect(&args.device, session)?;
    let property = resolve_property(connection.table(), &args.property)?;

    let value = connection
        .get_property(property)
        .map_err(|err| ncp_error("get failed", err))?;
    print_property(
        &PropertyOutput::new(connection.table(), property, &value),
        session.format,
    );

    connection
        .close()
        .map_err(|err| ncp_error("close failed", err))?;
    Ok(SUCCESS)
}
